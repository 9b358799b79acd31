//! `MetricsPublisher` implementations.
//!
//! - `HttpPublisher` posts JSON batches to a monitoring endpoint
//! - `StdoutPublisher` prints batches as JSON lines (no endpoint configured)
//! - `RecordingPublisher` keeps batches in memory for tests

pub mod http;
mod recording;
mod stdout;

pub use http::HttpPublisher;
pub use recording::RecordingPublisher;
pub use stdout::StdoutPublisher;
