//! Core error type definitions

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for autobuilder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for autobuilder operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system operations
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Network-related errors
    Network { endpoint: String, message: String },

    /// Subprocess execution errors
    CommandExecution {
        command: String,
        message: String,
        exit_code: Option<i32>,
    },

    /// Configuration errors (flags, config file, settings)
    Configuration { message: String },

    /// Toolchain catalogue or admissibility errors
    Toolchain { url: String, message: String },

    /// Configuration-sampling errors (oldconfig, randpackageconfig, fixups)
    Sampling { message: String },

    /// Result packaging errors; fatal for the owning worker
    Packaging { path: PathBuf, message: String },

    /// Operation timeout errors
    Timeout {
        operation: String,
        duration: Duration,
    },
}
