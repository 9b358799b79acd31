//! Memory reader backed by `/proc/meminfo`.

use std::path::Path;

use tracing::trace;

use crate::collector::MemoryReader;
use crate::collector::error::CollectError;
use crate::collector::procfs::parser::{MemInfo, parse_meminfo};
use crate::collector::snapshot::{MemorySnapshot, SharedBuffers, percentage};
use crate::collector::traits::FileSystem;

/// Reads memory and swap statistics from `<proc_path>/meminfo`.
pub struct ProcfsMemory<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> ProcfsMemory<F> {
    /// Creates a new procfs memory reader.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }
}

impl<F: FileSystem> MemoryReader for ProcfsMemory<F> {
    fn read_memory(&self, policy: SharedBuffers) -> Result<MemorySnapshot, CollectError> {
        let path = format!("{}/meminfo", self.proc_path);
        let content = self
            .fs
            .read_to_string(Path::new(&path))
            .map_err(|source| CollectError::Io {
                path: path.clone(),
                source,
            })?;
        let info = parse_meminfo(&content)
            .map_err(|e| CollectError::Parse(format!("{}: {}", path, e.message)))?;
        trace!("parsed {} entries from {}", info.len(), path);

        Ok(snapshot_from_meminfo(&info, policy))
    }
}

/// Derives a memory snapshot from parsed meminfo values.
pub fn snapshot_from_meminfo(info: &MemInfo, policy: SharedBuffers) -> MemorySnapshot {
    let mut available = info.mem_free();
    if policy == SharedBuffers::AsAvailable {
        available = available
            .saturating_add(info.buffers())
            .saturating_add(info.cached());
    }

    let total = info.mem_total();
    let used = total.saturating_sub(available);

    let swap_total = info.swap_total();
    let swap_available = info.swap_free();
    let swap_used = swap_total.saturating_sub(swap_available);

    MemorySnapshot {
        memory_available: available,
        memory_used: used,
        memory_utilization: percentage(used, total),
        swap_available,
        swap_used,
        swap_utilization: percentage(swap_used, swap_total),
    }
}
