//! In-memory mock filesystem for testing readers without real `/proc`.
//!
//! `MockFs` simulates file contents and `statvfs` results in memory,
//! allowing tests to run on macOS and in CI environments without Linux.

use crate::collector::traits::{FileSystem, FsStat};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Map from path to the filesystem statistics reported for it.
    mounts: HashMap<PathBuf, FsStat>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Registers `statvfs` results for `path`.
    ///
    /// # Arguments
    /// * `path` - Path that `statvfs` will be called with
    /// * `blocks` - Total blocks
    /// * `blocks_free` - Free blocks
    /// * `block_size` - Bytes per block
    pub fn add_mount(
        &mut self,
        path: impl AsRef<Path>,
        blocks: u64,
        blocks_free: u64,
        block_size: u64,
    ) {
        self.mounts.insert(
            path.as_ref().to_path_buf(),
            FsStat {
                blocks,
                blocks_free,
                block_size,
            },
        );
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn statvfs(&self, path: &Path) -> io::Result<FsStat> {
        self.mounts.get(path).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no filesystem at {:?}", path),
            )
        })
    }
}
