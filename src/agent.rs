//! The metrics agent: collect, select, publish on a schedule.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::collector::{CollectError, StatsReader};
use crate::config::{ConfigError, ValidatedConfig};
use crate::identity::{IdentityError, RegionError};
use crate::metrics::{
    Dimensions, MetricSelector, MetricsPublisher, PublishError, build_datums, publish,
};
use crate::scheduler::Scheduler;

/// Any error that stops the agent.
#[derive(Debug)]
pub enum AgentError {
    Config(ConfigError),
    Region(RegionError),
    Identity(IdentityError),
    Collect(CollectError),
    Publish(PublishError),
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::Config(e) => write!(f, "configuration error: {}", e),
            AgentError::Region(e) => write!(f, "region error: {}", e),
            AgentError::Identity(e) => write!(f, "identity error: {}", e),
            AgentError::Collect(e) => write!(f, "collection error: {}", e),
            AgentError::Publish(e) => write!(f, "publish error: {}", e),
        }
    }
}

impl std::error::Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AgentError::Config(e) => Some(e),
            AgentError::Region(e) => Some(e),
            AgentError::Identity(e) => Some(e),
            AgentError::Collect(e) => Some(e),
            AgentError::Publish(e) => Some(e),
        }
    }
}

impl From<ConfigError> for AgentError {
    fn from(e: ConfigError) -> Self {
        AgentError::Config(e)
    }
}

impl From<RegionError> for AgentError {
    fn from(e: RegionError) -> Self {
        AgentError::Region(e)
    }
}

impl From<IdentityError> for AgentError {
    fn from(e: IdentityError) -> Self {
        AgentError::Identity(e)
    }
}

impl From<CollectError> for AgentError {
    fn from(e: CollectError) -> Self {
        AgentError::Collect(e)
    }
}

impl From<PublishError> for AgentError {
    fn from(e: PublishError) -> Self {
        AgentError::Publish(e)
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub data_points: usize,
    pub calls: usize,
}

/// Collects host statistics and publishes them under fixed base dimensions.
pub struct Agent<R: StatsReader, P: MetricsPublisher> {
    config: ValidatedConfig,
    base_dimensions: Dimensions,
    selector: MetricSelector,
    reader: R,
    publisher: P,
}

impl<R: StatsReader, P: MetricsPublisher> Agent<R, P> {
    pub fn new(config: ValidatedConfig, base_dimensions: Dimensions, reader: R, publisher: P) -> Self {
        let selector = MetricSelector::new(config.toggles, config.memory_unit, config.disk_unit);
        Self {
            config,
            base_dimensions,
            selector,
            reader,
            publisher,
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn into_publisher(self) -> P {
        self.publisher
    }

    /// Runs one cycle stamped with the current time.
    pub fn run_cycle(&self) -> Result<CycleSummary, AgentError> {
        self.run_cycle_at(Utc::now())
    }

    /// Runs one cycle with every data point stamped `timestamp`.
    pub fn run_cycle_at(&self, timestamp: DateTime<Utc>) -> Result<CycleSummary, AgentError> {
        let records = self.selector.select(
            &self.reader,
            &self.config.disk_paths,
            self.config.shared_buffers,
        )?;
        let data = build_datums(&records, &self.base_dimensions, timestamp);

        let calls = publish(&self.publisher, &self.config.namespace, &data).inspect_err(|e| {
            warn!("publishing to {} failed: {}", self.config.namespace, e);
        })?;

        info!(
            "published {} data points to {} in {} calls",
            data.len(),
            self.config.namespace,
            calls
        );

        Ok(CycleSummary {
            data_points: data.len(),
            calls,
        })
    }

    /// Runs cycles on the configured schedule until `shutdown` is set, the
    /// first error, or after one cycle in run-once mode.
    pub fn run(&self, shutdown: Arc<AtomicBool>) -> Result<(), AgentError> {
        Scheduler::new(self.config.interval, self.config.run_once)
            .with_shutdown(shutdown)
            .run(|| self.run_cycle().map(|_| ()))
    }
}
