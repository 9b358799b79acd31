//! Error type shared by all statistics readers.

use std::io;

/// Error type for collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// I/O error reading a statistics file.
    Io { path: String, source: io::Error },
    /// Malformed content in a statistics file.
    Parse(String),
    /// A kernel counter could not be read or had an unexpected layout.
    Sysctl { key: String, message: String },
    /// Filesystem statistics could not be queried for a path.
    Disk { path: String, source: io::Error },
    /// Memory statistics are not implemented for the running OS.
    Unsupported { os: &'static str },
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Io { path, source } => {
                write!(f, "error retrieving memory stats from {}: {}", path, source)
            }
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
            CollectError::Sysctl { key, message } => {
                write!(f, "error reading sysctl {}: {}", key, message)
            }
            CollectError::Disk { path, source } => {
                write!(f, "error retrieving disk stats for '{}': {}", path, source)
            }
            CollectError::Unsupported { os } => {
                write!(f, "memory usage not supported for OS '{}'", os)
            }
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io { source, .. } | CollectError::Disk { source, .. } => Some(source),
            _ => None,
        }
    }
}
