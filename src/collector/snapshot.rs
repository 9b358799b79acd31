//! Point-in-time statistics produced by the readers.
//!
//! Byte counts are always in bytes; utilization is a percentage in `0..=100`
//! or `None` when the denominator was zero and the ratio is undefined.

/// Memory and swap statistics at a given point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemorySnapshot {
    /// Memory considered available to applications (bytes).
    pub memory_available: u64,
    /// Memory in use (bytes).
    pub memory_used: u64,
    /// Memory utilization percentage, `None` when total memory is zero.
    pub memory_utilization: Option<f64>,
    /// Free swap space (bytes).
    pub swap_available: u64,
    /// Swap space in use (bytes).
    pub swap_used: u64,
    /// Swap utilization percentage, `None` when no swap is configured.
    pub swap_utilization: Option<f64>,
}

/// Disk space statistics for one path at a given point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiskSnapshot {
    /// Path the statistics were queried for.
    pub mount_path: String,
    /// Free space (bytes).
    pub disk_available: u64,
    /// Used space (bytes).
    pub disk_used: u64,
    /// Used blocks over total blocks, `None` for a zero-sized filesystem.
    pub disk_utilization: Option<f64>,
}

/// How shared buffers and page cache count towards available memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SharedBuffers {
    /// `Buffers` and `Cached` are added to available memory.
    #[default]
    AsAvailable,
    /// `Buffers` and `Cached` are reported as used memory.
    AsUsed,
}

impl SharedBuffers {
    /// Maps the `--mem-shared-buffers-as-used` flag to a policy.
    pub fn from_flag(as_used: bool) -> Self {
        if as_used {
            Self::AsUsed
        } else {
            Self::AsAvailable
        }
    }
}

/// Computes `100 * part / whole`, or `None` when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(100.0 * (part as f64 / whole as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(750, 1000), Some(75.0));
        assert_eq!(percentage(0, 1000), Some(0.0));
        assert_eq!(percentage(0, 0), None);
        assert_eq!(percentage(10, 0), None);
    }

    #[test]
    fn test_shared_buffers_from_flag() {
        assert_eq!(SharedBuffers::from_flag(true), SharedBuffers::AsUsed);
        assert_eq!(SharedBuffers::from_flag(false), SharedBuffers::AsAvailable);
    }
}
