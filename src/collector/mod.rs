//! Host statistics readers.
//!
//! This module turns raw OS counters into normalized memory and disk
//! snapshots. The memory source is chosen per target OS at compile time;
//! disk statistics come from `statvfs(3)` everywhere.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  HostStats (StatsReader)                 │
//! │  ┌─────────────────────────┐   ┌──────────────────────┐  │
//! │  │      MemoryReader       │   │      read_disk       │  │
//! │  │  - ProcfsMemory (Linux) │   │  - statvfs(path)     │  │
//! │  │  - SysctlMemory (BSD)   │   └──────────┬───────────┘  │
//! │  │  - UnsupportedMemory    │              │              │
//! │  └─────────────────────────┘       ┌──────▼──────┐       │
//! │                                    │  FileSystem │       │
//! │                                    └──────┬──────┘       │
//! └───────────────────────────────────────────┼──────────────┘
//!                                  ┌──────────┴──────────┐
//!                           ┌──────▼──────┐       ┌──────▼──────┐
//!                           │   RealFs    │       │   MockFs    │
//!                           └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use cwagent::collector::{HostStats, MockFs, ProcfsMemory, SharedBuffers, StatsReader};
//!
//! let fs = MockFs::typical_linux();
//! let stats = HostStats::new(ProcfsMemory::new(fs.clone(), "/proc"), fs);
//! let mem = stats.read_memory(SharedBuffers::AsAvailable).unwrap();
//! assert!(mem.memory_utilization.is_some());
//! ```

pub mod disk;
mod error;
pub mod mock;
pub mod procfs;
mod snapshot;
pub mod sysctl;
pub mod traits;

pub use error::CollectError;
pub use mock::{MockFs, MockSysctl};
pub use procfs::ProcfsMemory;
pub use snapshot::{DiskSnapshot, MemorySnapshot, SharedBuffers, percentage};
pub use sysctl::{Sysctl, SysctlMemory};
pub use traits::{FileSystem, FsStat, RealFs};

/// Source of memory and swap statistics for one platform.
pub trait MemoryReader {
    fn read_memory(&self, policy: SharedBuffers) -> Result<MemorySnapshot, CollectError>;
}

/// Reads memory and disk statistics for the current host.
pub trait StatsReader {
    /// Reads memory and swap statistics.
    fn read_memory(&self, policy: SharedBuffers) -> Result<MemorySnapshot, CollectError>;

    /// Reads disk space statistics for the filesystem containing `path`.
    fn read_disk(&self, path: &str) -> Result<DiskSnapshot, CollectError>;
}

/// Memory reader for platforms without an implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedMemory;

impl MemoryReader for UnsupportedMemory {
    fn read_memory(&self, _policy: SharedBuffers) -> Result<MemorySnapshot, CollectError> {
        Err(CollectError::Unsupported {
            os: std::env::consts::OS,
        })
    }
}

/// Combines a platform memory reader with filesystem-based disk reads.
pub struct HostStats<M: MemoryReader, F: FileSystem> {
    memory: M,
    fs: F,
}

impl<M: MemoryReader, F: FileSystem> HostStats<M, F> {
    pub fn new(memory: M, fs: F) -> Self {
        Self { memory, fs }
    }
}

#[cfg(target_os = "linux")]
pub type PlatformMemory = ProcfsMemory<RealFs>;
#[cfg(target_os = "freebsd")]
pub type PlatformMemory = SysctlMemory<sysctl::KernelSysctl>;
#[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
pub type PlatformMemory = UnsupportedMemory;

impl HostStats<PlatformMemory, RealFs> {
    /// Creates the reader for the OS this binary was built for.
    ///
    /// # Arguments
    /// * `proc_path` - Base path to proc filesystem, only used on Linux
    #[allow(unused_variables)]
    pub fn platform(proc_path: &str) -> Self {
        #[cfg(target_os = "linux")]
        let memory = ProcfsMemory::new(RealFs::new(), proc_path);
        #[cfg(target_os = "freebsd")]
        let memory = SysctlMemory::new(sysctl::KernelSysctl::new());
        #[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
        let memory = UnsupportedMemory;

        Self::new(memory, RealFs::new())
    }
}

impl<M: MemoryReader, F: FileSystem> StatsReader for HostStats<M, F> {
    fn read_memory(&self, policy: SharedBuffers) -> Result<MemorySnapshot, CollectError> {
        self.memory.read_memory(policy)
    }

    fn read_disk(&self, path: &str) -> Result<DiskSnapshot, CollectError> {
        disk::read_disk(&self.fs, path)
    }
}
