use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write a `/bin/sh` script named `name` into `dir` and make it executable.
pub fn write_script(dir: &Path, name: &str, body: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    }
    Ok(path)
}

/// Command line running `script` through `sh`.
///
/// Going through the interpreter avoids exec'ing a file that was just written.
pub fn sh_command_line(script: &Path) -> String {
    format!("sh '{}'", script.display())
}
