//! Pre-built mock scenarios for testing.
//!
//! These scenarios provide realistic `/proc/meminfo` contents, mounts and
//! kernel counter tables for various host conditions.

use super::filesystem::MockFs;
use super::sysctl::MockSysctl;
use crate::collector::sysctl::{
    PAGE_SIZE_KEY, PAGES_CACHE_KEY, PAGES_FREE_KEY, PAGES_INACTIVE_KEY, TOTAL_MEM_KEY,
};

impl MockFs {
    /// Creates a typical Linux host with 16 GB of memory, 4 GB of swap
    /// (25% used) and a root filesystem that is 75% full.
    pub fn typical_linux() -> Self {
        let mut fs = Self::new();

        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
Active:          4096000 kB
Inactive:        2048000 kB
SwapTotal:       4096000 kB
SwapFree:        3072000 kB
Dirty:              1024 kB
Writeback:             0 kB
Slab:             512000 kB
SReclaimable:     256000 kB
HugePages_Total:       0
Hugepagesize:       2048 kB
",
        );

        fs.add_mount("/", 1000, 250, 4096);
        fs.add_mount("/home", 4_000_000, 3_000_000, 4096);

        fs
    }

    /// Creates a Linux host without any swap device.
    pub fn no_swap_linux() -> Self {
        let mut fs = Self::new();

        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:        2048000 kB
MemFree:          512000 kB
MemAvailable:    1024000 kB
Buffers:           64000 kB
Cached:           256000 kB
SwapCached:            0 kB
SwapTotal:             0 kB
SwapFree:              0 kB
",
        );

        fs.add_mount("/", 1000, 500, 4096);

        fs
    }
}

impl MockSysctl {
    /// Creates a FreeBSD host with ~4 GB of memory and two swap devices.
    pub fn typical_freebsd() -> Self {
        let mut sysctl = Self::new();

        sysctl.set(TOTAL_MEM_KEY, 4_096_000_000);
        sysctl.set(PAGE_SIZE_KEY, 4096);
        sysctl.set(PAGES_INACTIVE_KEY, 100_000);
        sysctl.set(PAGES_CACHE_KEY, 20_000);
        sysctl.set(PAGES_FREE_KEY, 80_000);

        sysctl.add_swap_device(1000, 100);
        sysctl.add_swap_device(3000, 900);

        sysctl
    }
}
