//! Selection of metrics to publish from snapshots.

use tracing::debug;

use crate::collector::{CollectError, DiskSnapshot, MemorySnapshot, SharedBuffers, StatsReader};
use crate::metrics::record::{DIMENSION_MOUNT_PATH, Dimensions, MetricName, MetricRecord};
use crate::metrics::unit::{PERCENT, Unit};

/// Which metrics are enabled. `all` turns on every metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricToggles {
    pub all: bool,
    pub mem_available: bool,
    pub mem_used: bool,
    pub mem_utilization: bool,
    pub swap_available: bool,
    pub swap_used: bool,
    pub swap_utilization: bool,
    pub disk_available: bool,
    pub disk_used: bool,
    pub disk_utilization: bool,
}

impl MetricToggles {
    /// Every metric enabled.
    pub fn all() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    pub fn enabled(&self, name: MetricName) -> bool {
        self.all
            || match name {
                MetricName::MemoryAvailable => self.mem_available,
                MetricName::MemoryUsed => self.mem_used,
                MetricName::MemoryUtilization => self.mem_utilization,
                MetricName::SwapAvailable => self.swap_available,
                MetricName::SwapUsed => self.swap_used,
                MetricName::SwapUtilization => self.swap_utilization,
                MetricName::DiskSpaceAvailable => self.disk_available,
                MetricName::DiskSpaceUsed => self.disk_used,
                MetricName::DiskSpaceUtilization => self.disk_utilization,
            }
    }

    pub fn any_memory(&self) -> bool {
        MEMORY_METRICS.iter().any(|&name| self.enabled(name))
    }

    pub fn any_disk(&self) -> bool {
        DISK_METRICS.iter().any(|&name| self.enabled(name))
    }
}

/// Memory metrics in publication order.
pub const MEMORY_METRICS: [MetricName; 6] = [
    MetricName::MemoryAvailable,
    MetricName::MemoryUsed,
    MetricName::MemoryUtilization,
    MetricName::SwapAvailable,
    MetricName::SwapUsed,
    MetricName::SwapUtilization,
];

/// Disk metrics in publication order.
pub const DISK_METRICS: [MetricName; 3] = [
    MetricName::DiskSpaceAvailable,
    MetricName::DiskSpaceUsed,
    MetricName::DiskSpaceUtilization,
];

/// A raw reading before unit conversion.
enum Reading {
    Bytes(u64),
    Percent(Option<f64>),
}

/// Turns snapshots into the records enabled by the configuration.
#[derive(Debug, Clone, Copy)]
pub struct MetricSelector {
    toggles: MetricToggles,
    memory_unit: Unit,
    disk_unit: Unit,
}

impl MetricSelector {
    pub fn new(toggles: MetricToggles, memory_unit: Unit, disk_unit: Unit) -> Self {
        Self {
            toggles,
            memory_unit,
            disk_unit,
        }
    }

    pub fn toggles(&self) -> &MetricToggles {
        &self.toggles
    }

    /// Records for a memory snapshot, in publication order.
    pub fn memory_records(&self, mem: &MemorySnapshot) -> Vec<MetricRecord> {
        MEMORY_METRICS
            .iter()
            .filter_map(|&name| {
                let reading = match name {
                    MetricName::MemoryAvailable => Reading::Bytes(mem.memory_available),
                    MetricName::MemoryUsed => Reading::Bytes(mem.memory_used),
                    MetricName::MemoryUtilization => Reading::Percent(mem.memory_utilization),
                    MetricName::SwapAvailable => Reading::Bytes(mem.swap_available),
                    MetricName::SwapUsed => Reading::Bytes(mem.swap_used),
                    MetricName::SwapUtilization => Reading::Percent(mem.swap_utilization),
                    MetricName::DiskSpaceAvailable
                    | MetricName::DiskSpaceUsed
                    | MetricName::DiskSpaceUtilization => return None,
                };
                self.record(name, reading, self.memory_unit, Dimensions::new())
            })
            .collect()
    }

    /// Records for one disk snapshot, tagged with its mount path.
    pub fn disk_records(&self, disk: &DiskSnapshot) -> Vec<MetricRecord> {
        let dimensions = Dimensions::from([(
            DIMENSION_MOUNT_PATH.to_string(),
            disk.mount_path.clone(),
        )]);

        DISK_METRICS
            .iter()
            .filter_map(|&name| {
                let reading = match name {
                    MetricName::DiskSpaceAvailable => Reading::Bytes(disk.disk_available),
                    MetricName::DiskSpaceUsed => Reading::Bytes(disk.disk_used),
                    MetricName::DiskSpaceUtilization => Reading::Percent(disk.disk_utilization),
                    MetricName::MemoryAvailable
                    | MetricName::MemoryUsed
                    | MetricName::MemoryUtilization
                    | MetricName::SwapAvailable
                    | MetricName::SwapUsed
                    | MetricName::SwapUtilization => return None,
                };
                self.record(name, reading, self.disk_unit, dimensions.clone())
            })
            .collect()
    }

    /// Reads every enabled category and returns the records to publish.
    ///
    /// Disk records come first, one group per path in the given order,
    /// followed by memory records. Any read failure aborts the selection.
    pub fn select<R: StatsReader + ?Sized>(
        &self,
        reader: &R,
        disk_paths: &[String],
        policy: SharedBuffers,
    ) -> Result<Vec<MetricRecord>, CollectError> {
        let mut records = Vec::new();

        if self.toggles.any_disk() {
            for path in disk_paths {
                let disk = reader.read_disk(path)?;
                debug!(
                    "disk {}: available={} used={} utilization={:?}",
                    disk.mount_path, disk.disk_available, disk.disk_used, disk.disk_utilization
                );
                records.extend(self.disk_records(&disk));
            }
        }

        if self.toggles.any_memory() {
            let mem = reader.read_memory(policy)?;
            debug!(
                "memory: available={} used={} utilization={:?} swap_used={} swap_utilization={:?}",
                mem.memory_available,
                mem.memory_used,
                mem.memory_utilization,
                mem.swap_used,
                mem.swap_utilization
            );
            records.extend(self.memory_records(&mem));
        }

        Ok(records)
    }

    fn record(
        &self,
        name: MetricName,
        reading: Reading,
        unit: Unit,
        dimensions: Dimensions,
    ) -> Option<MetricRecord> {
        if !self.toggles.enabled(name) {
            return None;
        }

        let (value, label) = match reading {
            Reading::Bytes(bytes) => (unit.scale(bytes), unit.label()),
            Reading::Percent(pct) => (pct?, PERCENT),
        };

        // Undefined ratios never reach the publisher.
        if !value.is_finite() {
            return None;
        }

        Some(MetricRecord::new(name, value, label).with_dimensions(dimensions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{HostStats, MockFs, ProcfsMemory};

    fn snapshot() -> MemorySnapshot {
        MemorySnapshot {
            memory_available: 3 * 1024 * 1024,
            memory_used: 1024 * 1024,
            memory_utilization: Some(25.0),
            swap_available: 2 * 1024 * 1024,
            swap_used: 0,
            swap_utilization: Some(0.0),
        }
    }

    fn names(records: &[MetricRecord]) -> Vec<MetricName> {
        records.iter().map(|r| r.name).collect()
    }

    #[test]
    fn test_memory_records_all() {
        let selector = MetricSelector::new(MetricToggles::all(), Unit::Megabytes, Unit::Gigabytes);
        let records = selector.memory_records(&snapshot());

        assert_eq!(names(&records), MEMORY_METRICS.to_vec());
        assert_eq!(records[0].value, 3.0);
        assert_eq!(records[0].unit, "Megabytes");
        assert_eq!(records[1].value, 1.0);
        assert_eq!(records[2].value, 25.0);
        assert_eq!(records[2].unit, "Percent");
        assert_eq!(records[3].value, 2.0);
        assert!(records.iter().all(|r| r.dimensions.is_empty()));
    }

    #[test]
    fn test_utilization_metrics_read_their_own_field() {
        let mem = MemorySnapshot {
            memory_utilization: Some(40.0),
            swap_utilization: Some(12.5),
            ..snapshot()
        };
        let disk = DiskSnapshot {
            mount_path: "/data".to_string(),
            disk_available: 1024,
            disk_used: 3072,
            disk_utilization: Some(75.0),
        };
        let selector = MetricSelector::new(MetricToggles::all(), Unit::Bytes, Unit::Bytes);

        let mem_records = selector.memory_records(&mem);
        let swap = mem_records
            .iter()
            .find(|r| r.name == MetricName::SwapUtilization)
            .unwrap();
        assert_eq!(swap.value, 12.5);
        assert!(mem_records.iter().all(|r| !DISK_METRICS.contains(&r.name)));

        let disk_records = selector.disk_records(&disk);
        assert_eq!(names(&disk_records), DISK_METRICS.to_vec());
        assert_eq!(disk_records[0].value, 1024.0);
        assert_eq!(disk_records[1].value, 3072.0);
        assert_eq!(disk_records[2].value, 75.0);
    }

    #[test]
    fn test_memory_records_single_toggle() {
        let toggles = MetricToggles {
            swap_used: true,
            ..MetricToggles::default()
        };
        let selector = MetricSelector::new(toggles, Unit::Kilobytes, Unit::Gigabytes);
        let records = selector.memory_records(&snapshot());

        assert_eq!(names(&records), vec![MetricName::SwapUsed]);
        assert_eq!(records[0].unit, "Kilobytes");
    }

    #[test]
    fn test_undefined_utilization_is_dropped() {
        let mem = MemorySnapshot {
            memory_utilization: None,
            swap_utilization: None,
            ..snapshot()
        };
        let selector = MetricSelector::new(MetricToggles::all(), Unit::Megabytes, Unit::Gigabytes);
        let records = selector.memory_records(&mem);

        assert_eq!(
            names(&records),
            vec![
                MetricName::MemoryAvailable,
                MetricName::MemoryUsed,
                MetricName::SwapAvailable,
                MetricName::SwapUsed,
            ]
        );
        assert!(records.iter().all(|r| r.value.is_finite()));
    }

    #[test]
    fn test_nan_utilization_is_dropped() {
        let mem = MemorySnapshot {
            memory_utilization: Some(f64::NAN),
            ..snapshot()
        };
        let toggles = MetricToggles {
            mem_utilization: true,
            ..MetricToggles::default()
        };
        let selector = MetricSelector::new(toggles, Unit::Megabytes, Unit::Gigabytes);
        assert!(selector.memory_records(&mem).is_empty());
    }

    #[test]
    fn test_disk_records_scenario() {
        let mut fs = MockFs::new();
        fs.add_mount("/", 1000, 250, 4096);
        let stats = HostStats::new(ProcfsMemory::new(fs.clone(), "/proc"), fs);

        let toggles = MetricToggles {
            disk_utilization: true,
            ..MetricToggles::default()
        };
        let selector = MetricSelector::new(toggles, Unit::Megabytes, Unit::Gigabytes);
        let records = selector
            .select(&stats, &["/".to_string()], SharedBuffers::AsAvailable)
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, MetricName::DiskSpaceUtilization);
        assert_eq!(records[0].value, 75.0);
        assert_eq!(records[0].unit, "Percent");
        assert_eq!(
            records[0].dimensions.get(DIMENSION_MOUNT_PATH),
            Some(&"/".to_string())
        );
    }

    #[test]
    fn test_select_orders_disks_before_memory() {
        let fs = MockFs::typical_linux();
        let stats = HostStats::new(ProcfsMemory::new(fs.clone(), "/proc"), fs);
        let selector = MetricSelector::new(MetricToggles::all(), Unit::Megabytes, Unit::Gigabytes);

        let paths = vec!["/".to_string(), "/home".to_string()];
        let records = selector
            .select(&stats, &paths, SharedBuffers::AsAvailable)
            .unwrap();

        assert_eq!(records.len(), 3 + 3 + 6);
        assert_eq!(records[0].dimensions[DIMENSION_MOUNT_PATH], "/");
        assert_eq!(records[3].dimensions[DIMENSION_MOUNT_PATH], "/home");
        assert_eq!(records[3].value, 3_000_000.0 * 4096.0 / 1073741824.0);
        assert_eq!(records[6].name, MetricName::MemoryAvailable);
    }

    #[test]
    fn test_select_skips_memory_read_when_not_selected() {
        // No meminfo at all: reading memory would fail.
        let mut fs = MockFs::new();
        fs.add_mount("/", 10, 5, 1024);
        let stats = HostStats::new(ProcfsMemory::new(fs.clone(), "/proc"), fs);

        let toggles = MetricToggles {
            disk_used: true,
            ..MetricToggles::default()
        };
        let selector = MetricSelector::new(toggles, Unit::Megabytes, Unit::Kilobytes);
        let records = selector
            .select(&stats, &["/".to_string()], SharedBuffers::AsAvailable)
            .unwrap();

        assert_eq!(names(&records), vec![MetricName::DiskSpaceUsed]);
        assert_eq!(records[0].value, 5.0);
    }

    #[test]
    fn test_select_fails_on_bad_path() {
        let fs = MockFs::typical_linux();
        let stats = HostStats::new(ProcfsMemory::new(fs.clone(), "/proc"), fs);
        let selector = MetricSelector::new(MetricToggles::all(), Unit::Megabytes, Unit::Gigabytes);

        let paths = vec!["/".to_string(), "/missing".to_string()];
        let err = selector
            .select(&stats, &paths, SharedBuffers::AsAvailable)
            .unwrap_err();
        assert!(err.to_string().contains("/missing"));
    }

    #[test]
    fn test_select_is_idempotent() {
        let fs = MockFs::typical_linux();
        let stats = HostStats::new(ProcfsMemory::new(fs.clone(), "/proc"), fs);
        let selector = MetricSelector::new(MetricToggles::all(), Unit::Megabytes, Unit::Gigabytes);
        let paths = vec!["/".to_string(), "/home".to_string()];

        let first = selector
            .select(&stats, &paths, SharedBuffers::AsAvailable)
            .unwrap();
        let second = selector
            .select(&stats, &paths, SharedBuffers::AsAvailable)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_total_memory_scenario() {
        let mut fs = MockFs::new();
        fs.add_file(
            "/proc/meminfo",
            "MemTotal: 0 kB\nMemFree: 0 kB\nSwapTotal: 0 kB\nSwapFree: 0 kB\n",
        );
        let stats = HostStats::new(ProcfsMemory::new(fs.clone(), "/proc"), fs);
        let toggles = MetricToggles {
            mem_available: true,
            mem_used: true,
            mem_utilization: true,
            ..MetricToggles::default()
        };
        let selector = MetricSelector::new(toggles, Unit::Bytes, Unit::Bytes);
        let records = selector
            .select(&stats, &[], SharedBuffers::AsAvailable)
            .unwrap();

        assert_eq!(
            names(&records),
            vec![MetricName::MemoryAvailable, MetricName::MemoryUsed]
        );
        assert!(
            records
                .iter()
                .all(|r| r.name != MetricName::MemoryUtilization)
        );
    }

    #[test]
    fn test_toggles() {
        let none = MetricToggles::default();
        assert!(!none.any_memory());
        assert!(!none.any_disk());

        let all = MetricToggles::all();
        assert!(all.any_memory());
        assert!(all.any_disk());

        let swap = MetricToggles {
            swap_utilization: true,
            ..MetricToggles::default()
        };
        assert!(swap.any_memory());
        assert!(!swap.any_disk());
        assert!(swap.enabled(MetricName::SwapUtilization));
        assert!(!swap.enabled(MetricName::SwapUsed));
    }
}
