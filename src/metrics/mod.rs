//! Metric records, unit conversion, selection and batched publication.

pub mod publish;
pub mod record;
pub mod selector;
pub mod unit;

pub use publish::{
    Dimension, MAX_DATUMS_PER_CALL, MetricDatum, MetricsPublisher, PublishError, build_datums,
    publish,
};
pub use record::{DIMENSION_MOUNT_PATH, Dimensions, MetricName, MetricRecord};
pub use selector::{MetricSelector, MetricToggles};
pub use unit::{InvalidUnit, PERCENT, Unit};
