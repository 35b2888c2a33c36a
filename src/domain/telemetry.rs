//! Destination telemetry records handed to downstream sinks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::kind::TelemetryKind;

/// Origin of a record on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Resource {
    pub source_id: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Unspecified,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub body: String,
    pub severity: Severity,
    pub severity_text: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub resource: Resource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetricValue {
    Sum { value: f64, monotonic: bool, cumulative: bool },
    Gauge { value: f64 },
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Sum { value, .. } | MetricValue::Gauge { value } => *value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub name: String,
    pub unit: Option<String>,
    pub value: MetricValue,
    pub timestamp: DateTime<Utc>,
    pub attributes: BTreeMap<String, String>,
    pub resource: Resource,
}

/// What a receiver pushes downstream for one gateway batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryBatch {
    pub kind: TelemetryKind,
    pub logs: Vec<LogRecord>,
    pub metrics: Vec<MetricPoint>,
}

impl TelemetryBatch {
    pub fn record_count(&self) -> usize {
        self.logs.len() + self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}
