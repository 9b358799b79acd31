//! Metric records produced each cycle.

use std::collections::BTreeMap;
use std::fmt;

/// Dimension name for the disk path a metric was read for.
pub const DIMENSION_MOUNT_PATH: &str = "MountPath";

/// Dimension name → value. Ordered so output is deterministic.
pub type Dimensions = BTreeMap<String, String>;

/// Every metric the agent can publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    MemoryAvailable,
    MemoryUsed,
    MemoryUtilization,
    SwapAvailable,
    SwapUsed,
    SwapUtilization,
    DiskSpaceAvailable,
    DiskSpaceUsed,
    DiskSpaceUtilization,
}

impl MetricName {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::MemoryAvailable => "MemoryAvailable",
            MetricName::MemoryUsed => "MemoryUsed",
            MetricName::MemoryUtilization => "MemoryUtilization",
            MetricName::SwapAvailable => "SwapAvailable",
            MetricName::SwapUsed => "SwapUsed",
            MetricName::SwapUtilization => "SwapUtilization",
            MetricName::DiskSpaceAvailable => "DiskSpaceAvailable",
            MetricName::DiskSpaceUsed => "DiskSpaceUsed",
            MetricName::DiskSpaceUtilization => "DiskSpaceUtilization",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single metric value ready to be published.
///
/// `value` is already converted to `unit`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub name: MetricName,
    pub value: f64,
    pub unit: &'static str,
    /// Dimensions specific to this record, merged with the base set on publish.
    pub dimensions: Dimensions,
}

impl MetricRecord {
    pub fn new(name: MetricName, value: f64, unit: &'static str) -> Self {
        Self {
            name,
            value,
            unit,
            dimensions: Dimensions::new(),
        }
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }
}
