//! Data point assembly and batched publication.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::metrics::record::{Dimensions, MetricRecord};

/// Maximum number of data points accepted by one publish call.
pub const MAX_DATUMS_PER_CALL: usize = 20;

/// A single name/value dimension on a data point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// One data point as sent to the monitoring service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricDatum {
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub timestamp: DateTime<Utc>,
    pub unit: String,
    pub value: f64,
}

/// Error returned by a publisher for one call.
#[derive(Debug)]
pub enum PublishError {
    /// The request could not be delivered.
    Transport(String),
    /// The service answered with a non-success status.
    Status { code: u16, body: String },
    /// The payload could not be encoded.
    Encode(String),
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishError::Transport(msg) => write!(f, "transport error: {}", msg),
            PublishError::Status { code, body } => {
                write!(f, "service returned status {}: {}", code, body)
            }
            PublishError::Encode(msg) => write!(f, "encode error: {}", msg),
        }
    }
}

impl std::error::Error for PublishError {}

/// Capability to deliver a bounded batch of data points.
pub trait MetricsPublisher {
    /// Sends at most [`MAX_DATUMS_PER_CALL`] data points under `namespace`.
    fn put_metric_data(&self, namespace: &str, data: &[MetricDatum]) -> Result<(), PublishError>;
}

impl<P: MetricsPublisher + ?Sized> MetricsPublisher for Box<P> {
    fn put_metric_data(&self, namespace: &str, data: &[MetricDatum]) -> Result<(), PublishError> {
        (**self).put_metric_data(namespace, data)
    }
}

/// Converts records into data points sharing one timestamp.
///
/// Each data point carries the base dimensions plus the record's own; a
/// record dimension overrides a base dimension with the same name.
pub fn build_datums(
    records: &[MetricRecord],
    base: &Dimensions,
    timestamp: DateTime<Utc>,
) -> Vec<MetricDatum> {
    records
        .iter()
        .map(|record| {
            let mut merged = base.clone();
            merged.extend(
                record
                    .dimensions
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );

            MetricDatum {
                metric_name: record.name.to_string(),
                dimensions: merged
                    .into_iter()
                    .map(|(name, value)| Dimension { name, value })
                    .collect(),
                timestamp,
                unit: record.unit.to_string(),
                value: record.value,
            }
        })
        .collect()
}

/// Publishes `data` in consecutive batches of at most [`MAX_DATUMS_PER_CALL`].
///
/// Batches are sent in order. The first failing call stops publication and
/// its error is returned; later batches are not attempted. Returns the
/// number of calls made.
pub fn publish<P: MetricsPublisher + ?Sized>(
    publisher: &P,
    namespace: &str,
    data: &[MetricDatum],
) -> Result<usize, PublishError> {
    let mut calls = 0;

    for batch in data.chunks(MAX_DATUMS_PER_CALL) {
        debug!(
            "publishing batch {} ({} data points) to {}",
            calls + 1,
            batch.len(),
            namespace
        );
        publisher.put_metric_data(namespace, batch)?;
        calls += 1;
    }

    Ok(calls)
}
