//! Mock implementations for testing.
//!
//! This module provides `MockFs`, `MockSysctl` and pre-built scenarios for
//! testing readers without access to a real Linux or FreeBSD host.

mod filesystem;
mod scenarios;
mod sysctl;

pub use filesystem::MockFs;
pub use sysctl::{MockSysctl, xswdev};
