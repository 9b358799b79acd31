//! Publisher that writes batches as JSON lines.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::metrics::{MetricDatum, MetricsPublisher, PublishError};
use crate::publisher::http::PutMetricDataRequest;

/// Writes one JSON document per batch to a writer (stdout by default).
pub struct StdoutPublisher<W: Write = io::Stdout> {
    out: Mutex<W>,
}

impl StdoutPublisher<io::Stdout> {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for StdoutPublisher<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> StdoutPublisher<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write> MetricsPublisher for StdoutPublisher<W> {
    fn put_metric_data(&self, namespace: &str, data: &[MetricDatum]) -> Result<(), PublishError> {
        let body = PutMetricDataRequest {
            namespace,
            metric_data: data,
        };
        let line = serde_json::to_string(&body).map_err(|e| PublishError::Encode(e.to_string()))?;

        let mut out = self
            .out
            .lock()
            .map_err(|_| PublishError::Transport("output lock poisoned".to_string()))?;
        writeln!(out, "{}", line).map_err(|e| PublishError::Transport(e.to_string()))?;
        out.flush()
            .map_err(|e| PublishError::Transport(e.to_string()))
    }
}
