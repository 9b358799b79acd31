//! Reporting units for byte-valued metrics.

use std::fmt;
use std::str::FromStr;

/// Unit label used for every utilization metric.
pub const PERCENT: &str = "Percent";

/// A configured reporting unit for memory or disk values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
    Terabytes,
}

impl Unit {
    pub const ALL: [Unit; 5] = [
        Unit::Bytes,
        Unit::Kilobytes,
        Unit::Megabytes,
        Unit::Gigabytes,
        Unit::Terabytes,
    ];

    /// Number of bytes in one unit.
    pub fn factor(self) -> f64 {
        let shift = match self {
            Unit::Bytes => 0,
            Unit::Kilobytes => 10,
            Unit::Megabytes => 20,
            Unit::Gigabytes => 30,
            Unit::Terabytes => 40,
        };
        (1u64 << shift) as f64
    }

    /// Unit name understood by the monitoring service.
    pub fn label(self) -> &'static str {
        match self {
            Unit::Bytes => "Bytes",
            Unit::Kilobytes => "Kilobytes",
            Unit::Megabytes => "Megabytes",
            Unit::Gigabytes => "Gigabytes",
            Unit::Terabytes => "Terabytes",
        }
    }

    /// Symbol accepted on the command line.
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Bytes => "B",
            Unit::Kilobytes => "KB",
            Unit::Megabytes => "MB",
            Unit::Gigabytes => "GB",
            Unit::Terabytes => "TB",
        }
    }

    /// Converts a byte count to this unit.
    pub fn scale(self, bytes: u64) -> f64 {
        bytes as f64 / self.factor()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Error returned for a symbol outside `B`, `KB`, `MB`, `GB`, `TB`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidUnit(pub String);

impl fmt::Display for InvalidUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid unit: {}", self.0)
    }
}

impl std::error::Error for InvalidUnit {}

impl FromStr for Unit {
    type Err = InvalidUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::ALL
            .into_iter()
            .find(|unit| unit.symbol() == s)
            .ok_or_else(|| InvalidUnit(s.to_string()))
    }
}
