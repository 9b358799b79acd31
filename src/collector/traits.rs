//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait lets the readers work against the real `/proc`
//! filesystem and `statvfs(3)` in production, and against an in-memory
//! `MockFs` in tests or on CI hosts without Linux.

use std::io;
use std::path::Path;

/// Raw filesystem statistics for a path, as reported by `statvfs(3)`.
///
/// `blocks` and `blocks_free` are counted in units of `block_size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsStat {
    /// Total number of blocks on the filesystem.
    pub blocks: u64,
    /// Number of free blocks.
    pub blocks_free: u64,
    /// Size of one block in bytes.
    pub block_size: u64,
}

/// Abstraction for filesystem operations.
///
/// This trait allows readers to use the real filesystem or a mock
/// implementation for testing purposes.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    ///
    /// # Arguments
    /// * `path` - Path to the file to read
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Queries filesystem statistics for the filesystem containing `path`.
    ///
    /// # Arguments
    /// * `path` - Any path on the filesystem of interest
    fn statvfs(&self, path: &Path) -> io::Result<FsStat>;
}

/// Real filesystem implementation that delegates to `std::fs` and `nix`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn statvfs(&self, path: &Path) -> io::Result<FsStat> {
        let stat = nix::sys::statvfs::statvfs(path).map_err(io::Error::from)?;

        // f_blocks and f_bfree are expressed in fragment-size units.
        Ok(FsStat {
            blocks: stat.blocks() as u64,
            blocks_free: stat.blocks_free() as u64,
            block_size: stat.fragment_size() as u64,
        })
    }
}
