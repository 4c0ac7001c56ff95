//! Display implementations for error types

use super::types::Error;
use std::fmt;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "file system {} operation failed for '{}': {}",
                    operation,
                    path.display(),
                    source
                )
            }
            Error::Network { endpoint, message } => {
                write!(f, "network error for '{endpoint}': {message}")
            }
            Error::CommandExecution {
                command,
                message,
                exit_code,
            } => match exit_code {
                Some(code) => {
                    write!(f, "command '{command}' failed with exit code {code}: {message}")
                }
                None => write!(f, "command '{command}' failed: {message}"),
            },
            Error::Configuration { message } => {
                write!(f, "configuration error: {message}")
            }
            Error::Toolchain { url, message } => {
                write!(f, "toolchain '{url}' error: {message}")
            }
            Error::Sampling { message } => {
                write!(f, "configuration sampling failed: {message}")
            }
            Error::Packaging { path, message } => {
                write!(
                    f,
                    "failed to package results at '{}': {}",
                    path.display(),
                    message
                )
            }
            Error::Timeout {
                operation,
                duration,
            } => {
                write!(f, "operation '{operation}' timed out after {duration:?}")
            }
        }
    }
}
