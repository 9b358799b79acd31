//! JSON-over-HTTP publisher.

use reqwest::blocking::Client;
use serde::Serialize;

use crate::metrics::{MetricDatum, MetricsPublisher, PublishError};

/// Header carrying the region the metrics belong to.
pub const REGION_HEADER: &str = "X-Metrics-Region";

/// Request body for one publish call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutMetricDataRequest<'a> {
    pub namespace: &'a str,
    pub metric_data: &'a [MetricDatum],
}

/// Posts each batch as a JSON document to a fixed endpoint.
pub struct HttpPublisher {
    client: Client,
    endpoint: String,
    region: String,
}

impl HttpPublisher {
    pub fn new(endpoint: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            region: region.into(),
        }
    }
}

impl MetricsPublisher for HttpPublisher {
    fn put_metric_data(&self, namespace: &str, data: &[MetricDatum]) -> Result<(), PublishError> {
        let body = PutMetricDataRequest {
            namespace,
            metric_data: data,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(REGION_HEADER, &self.region)
            .json(&body)
            .send()
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PublishError::Status {
                code: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        Ok(())
    }
}
