//! Disk space statistics via `statvfs(3)`.

use std::path::Path;

use crate::collector::error::CollectError;
use crate::collector::snapshot::{DiskSnapshot, percentage};
use crate::collector::traits::{FileSystem, FsStat};

/// Queries filesystem statistics for `path` and converts them to a snapshot.
pub fn read_disk<F: FileSystem>(fs: &F, path: &str) -> Result<DiskSnapshot, CollectError> {
    let stat = fs
        .statvfs(Path::new(path))
        .map_err(|source| CollectError::Disk {
            path: path.to_string(),
            source,
        })?;

    Ok(snapshot_from_stat(path, &stat))
}

/// Converts raw block counts into byte counts and a utilization percentage.
///
/// Utilization is the ratio of used blocks to total blocks.
pub fn snapshot_from_stat(path: &str, stat: &FsStat) -> DiskSnapshot {
    let used_blocks = stat.blocks.saturating_sub(stat.blocks_free);

    DiskSnapshot {
        mount_path: path.to_string(),
        disk_available: stat.blocks_free.saturating_mul(stat.block_size),
        disk_used: used_blocks.saturating_mul(stat.block_size),
        disk_utilization: percentage(used_blocks, stat.blocks),
    }
}
