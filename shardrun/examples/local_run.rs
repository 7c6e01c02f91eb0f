//! Run each shard of a small job locally.
//!
//! Registers a simple job and a streaming pipeline job, then runs every shard
//! of both and a script job, logging through `tracing-subscriber`.
//!
//! ```text
//! RUST_LOG=shardrun=debug cargo run -p shardrun --example local_run
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use shardrun::*;
use tracing_subscriber::EnvFilter;

struct PrintShard;

impl SimpleJob for PrintShard {
    fn execute(&self, ctx: &ShardingContext) -> anyhow::Result<()> {
        println!(
            "[simple] {} shard {}/{} parameter={:?}",
            ctx.job_name(),
            ctx.sharding_item(),
            ctx.sharding_total_count(),
            ctx.sharding_parameter()
        );
        Ok(())
    }
}

/// Hands out three pages of orders, then runs dry.
struct OrderPages {
    page: AtomicUsize,
}

impl PipelineJob for OrderPages {
    fn fetch_data(&self, ctx: &ShardingContext) -> anyhow::Result<Vec<String>> {
        let page = self.page.fetch_add(1, Ordering::SeqCst);
        if page >= 3 {
            return Ok(Vec::new());
        }
        Ok((0..2)
            .map(|n| format!("order-{}-{page}-{n}", ctx.sharding_item()))
            .collect())
    }

    fn process_data(&self, _ctx: &ShardingContext, data: Vec<String>) -> anyhow::Result<()> {
        for order in data {
            println!("[pipeline] processed {order}");
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut registry = JobRegistry::new();
    registry
        .register_simple("demo.PrintShard", || PrintShard)
        .register_pipeline("demo.OrderPages", || OrderPages {
            page: AtomicUsize::new(0),
        });

    let runner = LocalRunner::builder()
        .with_config(RunnerConfig::new().with_max_streaming_cycles(10))
        .with_registry(registry)
        .build()?;

    let settings = JobCoreSettings::builder("demo", "0 */5 * * * ?", 3)
        .sharding_item_parameters("0=Beijing,1=Shanghai,2=Guangzhou")
        .job_parameter("dbName=demo")
        .build()?;

    let job_types = [
        JobTypeConfig::simple("demo.PrintShard"),
        JobTypeConfig::pipeline("demo.OrderPages", true),
        JobTypeConfig::script("sh -c 'echo \"[script] shard $SHARDRUN_SHARDING_ITEM: $SHARDRUN_SHARDING_PARAMETER\"'"),
    ];

    for job_type in job_types {
        for item in 0..settings.sharding_total_count() {
            let request = LocalRunRequest::new(settings.clone(), job_type.clone(), item);
            match runner.run(&request) {
                Ok(report) => println!(
                    "{} shard {} ok in {:?} ({} items)",
                    report.job_kind, report.sharding_item, report.elapsed, report.items_processed
                ),
                Err(err) => println!("{} shard {item} failed ({}): {err}", job_type.kind(), err.kind()),
            }
        }
    }

    Ok(())
}
