//! Memory reader backed by BSD kernel counters (`sysctl(3)`).
//!
//! Physical memory is derived from page counters; swap is summed over every
//! `vm.swap_info.<n>` device record until the kernel reports the index as
//! missing.

#[cfg(target_os = "freebsd")]
mod freebsd;

#[cfg(target_os = "freebsd")]
pub use freebsd::KernelSysctl;

use std::io;

use tracing::trace;

use crate::collector::MemoryReader;
use crate::collector::error::CollectError;
use crate::collector::snapshot::{MemorySnapshot, SharedBuffers, percentage};

pub const TOTAL_MEM_KEY: &str = "hw.realmem";
pub const PAGE_SIZE_KEY: &str = "hw.pagesize";
pub const PAGES_INACTIVE_KEY: &str = "vm.stats.vm.v_inactive_count";
pub const PAGES_CACHE_KEY: &str = "vm.stats.vm.v_cache_count";
pub const PAGES_FREE_KEY: &str = "vm.stats.vm.v_free_count";
pub const SWAP_INFO_KEY: &str = "vm.swap_info";

/// Size in bytes of `struct xswdev` as returned by `vm.swap_info.<n>`.
pub const SWAP_INFO_SIZE: usize = 20;
/// Supported `xsw_version`.
pub const SWAP_INFO_VERSION: i32 = 1;

/// Access to named kernel counters.
pub trait Sysctl: Send + Sync {
    /// Reads a 64-bit unsigned counter.
    fn read_u64(&self, key: &str) -> io::Result<u64>;

    /// Reads a 32-bit unsigned counter.
    fn read_u32(&self, key: &str) -> io::Result<u32>;

    /// Reads the raw value of `key` with `index` appended to its MIB.
    ///
    /// A missing index must be reported as `io::ErrorKind::NotFound`.
    fn read_indexed(&self, key: &str, index: u32) -> io::Result<Vec<u8>>;
}

/// One decoded swap device record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapDevice {
    /// Size of the device in pages.
    pub nblks: u64,
    /// Pages in use.
    pub used: u64,
}

/// Decodes a `struct xswdev` record.
///
/// ```text
/// struct xswdev {
///     u_int   xsw_version;
///     dev_t   xsw_dev;
///     int     xsw_flags;
///     int     xsw_nblks;
///     int     xsw_used;
/// };
/// ```
///
/// The record is read as five native-endian 32-bit words.
pub fn decode_xswdev(raw: &[u8]) -> Result<SwapDevice, CollectError> {
    if raw.len() != SWAP_INFO_SIZE {
        return Err(sysctl_error(
            SWAP_INFO_KEY,
            format!("unexpected size {} (expected {})", raw.len(), SWAP_INFO_SIZE),
        ));
    }

    let mut words = [0i32; 5];
    for (word, chunk) in words.iter_mut().zip(raw.chunks_exact(4)) {
        *word = i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    if words[0] != SWAP_INFO_VERSION {
        return Err(sysctl_error(
            SWAP_INFO_KEY,
            format!("unexpected version {}", words[0]),
        ));
    }

    let to_pages = |value: i32, field: &str| {
        u64::try_from(value)
            .map_err(|_| sysctl_error(SWAP_INFO_KEY, format!("negative {} {}", field, value)))
    };

    Ok(SwapDevice {
        nblks: to_pages(words[3], "xsw_nblks")?,
        used: to_pages(words[4], "xsw_used")?,
    })
}

fn sysctl_error(key: &str, message: impl Into<String>) -> CollectError {
    CollectError::Sysctl {
        key: key.to_string(),
        message: message.into(),
    }
}

fn read_u32<S: Sysctl>(sysctl: &S, key: &str) -> Result<u32, CollectError> {
    sysctl
        .read_u32(key)
        .map_err(|e| sysctl_error(key, e.to_string()))
}

/// Reads memory and swap statistics from kernel page counters.
pub struct SysctlMemory<S: Sysctl> {
    sysctl: S,
}

impl<S: Sysctl> SysctlMemory<S> {
    pub fn new(sysctl: S) -> Self {
        Self { sysctl }
    }

    /// Sums `(nblks, used)` pages over every configured swap device.
    fn swap_totals(&self) -> Result<(u64, u64), CollectError> {
        let mut total = 0u64;
        let mut used = 0u64;
        let mut index = 0u32;

        loop {
            let raw = match self.sysctl.read_indexed(SWAP_INFO_KEY, index) {
                Ok(raw) => raw,
                Err(e) if e.kind() == io::ErrorKind::NotFound => break,
                Err(e) => return Err(sysctl_error(SWAP_INFO_KEY, e.to_string())),
            };

            let device = decode_xswdev(&raw)?;
            trace!(
                "swap device {}: {} pages, {} used",
                index, device.nblks, device.used
            );
            total = total.saturating_add(device.nblks);
            used = used.saturating_add(device.used);
            index += 1;
        }

        Ok((total, used))
    }
}

impl<S: Sysctl> MemoryReader for SysctlMemory<S> {
    // Page counters already separate cache from free memory, so the
    // shared-buffers policy does not apply here.
    fn read_memory(&self, _policy: SharedBuffers) -> Result<MemorySnapshot, CollectError> {
        let total_mem = self
            .sysctl
            .read_u64(TOTAL_MEM_KEY)
            .map_err(|e| sysctl_error(TOTAL_MEM_KEY, e.to_string()))?;
        let page_size = u64::from(read_u32(&self.sysctl, PAGE_SIZE_KEY)?);
        let inactive = u64::from(read_u32(&self.sysctl, PAGES_INACTIVE_KEY)?);
        let cache = u64::from(read_u32(&self.sysctl, PAGES_CACHE_KEY)?);
        let free = u64::from(read_u32(&self.sysctl, PAGES_FREE_KEY)?);

        let (swap_total, swap_used) = self.swap_totals()?;

        let memory_available = page_size.saturating_mul(inactive + cache + free);
        let memory_used = total_mem.saturating_sub(memory_available);

        Ok(MemorySnapshot {
            memory_available,
            memory_used,
            memory_utilization: percentage(memory_used, total_mem),
            swap_available: page_size.saturating_mul(swap_total.saturating_sub(swap_used)),
            swap_used: page_size.saturating_mul(swap_used),
            swap_utilization: percentage(swap_used, swap_total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockSysctl, xswdev};

    #[test]
    fn test_decode_xswdev() {
        let device = decode_xswdev(&xswdev(1, 2048, 512)).unwrap();
        assert_eq!(device, SwapDevice { nblks: 2048, used: 512 });
    }

    #[test]
    fn test_decode_xswdev_wrong_size() {
        let err = decode_xswdev(&[0u8; 16]).unwrap_err();
        assert!(err.to_string().contains("unexpected size 16"));
    }

    #[test]
    fn test_decode_xswdev_wrong_version() {
        let err = decode_xswdev(&xswdev(2, 2048, 512)).unwrap_err();
        assert!(err.to_string().contains("unexpected version 2"));
    }

    #[test]
    fn test_read_memory_typical() {
        let reader = SysctlMemory::new(MockSysctl::typical_freebsd());
        let mem = reader.read_memory(SharedBuffers::AsAvailable).unwrap();

        // 4096 * (100000 + 20000 + 80000) pages
        let available = 4096 * 200_000;
        assert_eq!(mem.memory_available, available);
        assert_eq!(mem.memory_used, 4_096_000_000 - available);
        assert_eq!(mem.memory_available + mem.memory_used, 4_096_000_000);
        assert_eq!(mem.memory_utilization, Some(80.0));

        // Two devices: 1000 + 3000 pages, 100 + 900 used
        assert_eq!(mem.swap_used, 4096 * 1000);
        assert_eq!(mem.swap_available, 4096 * 3000);
        assert_eq!(mem.swap_utilization, Some(25.0));
    }

    #[test]
    fn test_read_memory_ignores_shared_buffers_policy() {
        let reader = SysctlMemory::new(MockSysctl::typical_freebsd());
        let a = reader.read_memory(SharedBuffers::AsAvailable).unwrap();
        let b = reader.read_memory(SharedBuffers::AsUsed).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_read_memory_without_swap() {
        let mut sysctl = MockSysctl::typical_freebsd();
        sysctl.clear_swap_devices();
        let mem = SysctlMemory::new(sysctl)
            .read_memory(SharedBuffers::AsAvailable)
            .unwrap();

        assert_eq!(mem.swap_available, 0);
        assert_eq!(mem.swap_used, 0);
        assert_eq!(mem.swap_utilization, None);
    }

    #[test]
    fn test_read_memory_missing_counter() {
        let mut sysctl = MockSysctl::typical_freebsd();
        sysctl.remove(PAGES_CACHE_KEY);
        let err = SysctlMemory::new(sysctl)
            .read_memory(SharedBuffers::AsAvailable)
            .unwrap_err();
        assert!(err.to_string().contains(PAGES_CACHE_KEY));
    }

    #[test]
    fn test_swap_enumeration_error_is_fatal() {
        let mut sysctl = MockSysctl::typical_freebsd();
        sysctl.fail_swap_device(1, io::ErrorKind::PermissionDenied);
        let err = SysctlMemory::new(sysctl)
            .read_memory(SharedBuffers::AsAvailable)
            .unwrap_err();
        assert!(matches!(err, CollectError::Sysctl { ref key, .. } if key == SWAP_INFO_KEY));
    }

    #[test]
    fn test_swap_record_with_bad_layout_is_fatal() {
        let mut sysctl = MockSysctl::typical_freebsd();
        sysctl.add_swap_device_raw(vec![0u8; 24]);
        let err = SysctlMemory::new(sysctl)
            .read_memory(SharedBuffers::AsAvailable)
            .unwrap_err();
        assert!(err.to_string().contains("unexpected size 24"));
    }
}
