//! PID file handling

use autobuild_core::{Error, Result};
use std::fs;
use std::path::Path;

/// Write the current process id to the configured PID file.
pub fn write_pid_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::file_system(parent, "create pid file directory", e))?;
    }
    fs::write(path, format!("{}\n", std::process::id()))
        .map_err(|e| Error::file_system(path, "write pid file", e))
}
