//! In-memory kernel counter table for testing `SysctlMemory` on any host.

use std::collections::HashMap;
use std::io;

use crate::collector::sysctl::{SWAP_INFO_KEY, SWAP_INFO_SIZE, Sysctl};

/// Encodes a `struct xswdev` record the way the kernel returns it.
pub fn xswdev(version: i32, nblks: i32, used: i32) -> Vec<u8> {
    let mut raw = Vec::with_capacity(SWAP_INFO_SIZE);
    for word in [version, 0, 0, nblks, used] {
        raw.extend_from_slice(&word.to_ne_bytes());
    }
    raw
}

#[derive(Debug, Clone)]
enum Entry {
    Value(Vec<u8>),
    Error(io::ErrorKind),
}

/// In-memory sysctl table.
#[derive(Debug, Clone, Default)]
pub struct MockSysctl {
    values: HashMap<String, u64>,
    swap_devices: Vec<Entry>,
}

impl MockSysctl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a scalar counter.
    pub fn set(&mut self, key: &str, value: u64) {
        self.values.insert(key.to_string(), value);
    }

    /// Removes a scalar counter so reading it fails with `NotFound`.
    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    /// Appends a swap device with the given page counts.
    pub fn add_swap_device(&mut self, nblks: i32, used: i32) {
        self.add_swap_device_raw(xswdev(1, nblks, used));
    }

    /// Appends a raw `vm.swap_info.<n>` record.
    pub fn add_swap_device_raw(&mut self, raw: Vec<u8>) {
        self.swap_devices.push(Entry::Value(raw));
    }

    /// Makes reading swap device `index` fail with `kind`.
    pub fn fail_swap_device(&mut self, index: usize, kind: io::ErrorKind) {
        if index < self.swap_devices.len() {
            self.swap_devices[index] = Entry::Error(kind);
        } else {
            self.swap_devices.push(Entry::Error(kind));
        }
    }

    pub fn clear_swap_devices(&mut self) {
        self.swap_devices.clear();
    }

    fn lookup(&self, key: &str) -> io::Result<u64> {
        self.values.get(key).copied().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("unknown oid '{}'", key))
        })
    }
}

impl Sysctl for MockSysctl {
    fn read_u64(&self, key: &str) -> io::Result<u64> {
        self.lookup(key)
    }

    fn read_u32(&self, key: &str) -> io::Result<u32> {
        let value = self.lookup(key)?;
        u32::try_from(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn read_indexed(&self, key: &str, index: u32) -> io::Result<Vec<u8>> {
        if key != SWAP_INFO_KEY {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("unknown oid '{}'", key),
            ));
        }

        match self.swap_devices.get(index as usize) {
            Some(Entry::Value(raw)) => Ok(raw.clone()),
            Some(Entry::Error(kind)) => Err(io::Error::new(*kind, "injected failure")),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no swap device {}", index),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xswdev_layout() {
        let raw = xswdev(1, 10, 3);
        assert_eq!(raw.len(), SWAP_INFO_SIZE);
        assert_eq!(&raw[12..16], &10i32.to_ne_bytes());
        assert_eq!(&raw[16..20], &3i32.to_ne_bytes());
    }

    #[test]
    fn test_swap_devices_end_with_not_found() {
        let mut sysctl = MockSysctl::new();
        sysctl.add_swap_device(10, 1);

        assert!(sysctl.read_indexed(SWAP_INFO_KEY, 0).is_ok());
        let err = sysctl.read_indexed(SWAP_INFO_KEY, 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_read_u32_rejects_wide_values() {
        let mut sysctl = MockSysctl::new();
        sysctl.set("hw.pagesize", u64::MAX);
        assert!(sysctl.read_u32("hw.pagesize").is_err());
        assert_eq!(sysctl.read_u64("hw.pagesize").unwrap(), u64::MAX);
    }
}
