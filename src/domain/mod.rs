//! Domain data shapes shared across layers

pub mod envelope;
pub mod kind;
pub mod telemetry;

pub use envelope::{Envelope, EnvelopeBatch, Payload};
pub use kind::{Selector, TelemetryKind};
pub use telemetry::{LogRecord, MetricPoint, MetricValue, Resource, Severity, TelemetryBatch};
