//! Publisher that keeps every batch in memory, for tests.

use std::cell::{Cell, RefCell};

use crate::metrics::{MetricDatum, MetricsPublisher, PublishError};

/// Records `(namespace, batch)` pairs and can be told to fail on a given call.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    batches: RefCell<Vec<(String, Vec<MetricDatum>)>>,
    attempts: Cell<usize>,
    fail_on: Option<usize>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the `call`-th publish attempt (1-based) with a transport error.
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::default()
        }
    }

    /// Batches delivered successfully, in order.
    pub fn batches(&self) -> Vec<(String, Vec<MetricDatum>)> {
        self.batches.borrow().clone()
    }

    /// Number of publish calls made, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.get()
    }
}

impl MetricsPublisher for RecordingPublisher {
    fn put_metric_data(&self, namespace: &str, data: &[MetricDatum]) -> Result<(), PublishError> {
        let attempt = self.attempts.get() + 1;
        self.attempts.set(attempt);

        if self.fail_on == Some(attempt) {
            return Err(PublishError::Transport(format!(
                "injected failure on call {}",
                attempt
            )));
        }

        self.batches
            .borrow_mut()
            .push((namespace.to_string(), data.to_vec()));
        Ok(())
    }
}
