use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Telemetry family a receiver subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryKind {
    Logs,
    Metrics,
    Traces,
}

/// Envelope payload filter sent with a subscription request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    Log,
    Counter,
    Gauge,
}

impl Selector {
    /// Bare query flag the RLP gateway's HTTP API expects for this selector.
    pub fn query_flag(&self) -> &'static str {
        match self {
            Selector::Log => "log",
            Selector::Counter => "counter",
            Selector::Gauge => "gauge",
        }
    }
}

const LOG_SELECTORS: &[Selector] = &[Selector::Log];
const METRIC_SELECTORS: &[Selector] = &[Selector::Counter, Selector::Gauge];
// No span selector is requested upstream yet, so a traces subscription matches nothing.
const TRACE_SELECTORS: &[Selector] = &[];

impl TelemetryKind {
    pub const ALL: [TelemetryKind; 3] =
        [TelemetryKind::Logs, TelemetryKind::Metrics, TelemetryKind::Traces];

    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryKind::Logs => "logs",
            TelemetryKind::Metrics => "metrics",
            TelemetryKind::Traces => "traces",
        }
    }

    pub fn selectors(&self) -> &'static [Selector] {
        match self {
            TelemetryKind::Logs => LOG_SELECTORS,
            TelemetryKind::Metrics => METRIC_SELECTORS,
            TelemetryKind::Traces => TRACE_SELECTORS,
        }
    }

    /// Consumer group for the gateway's work-sharing protocol, kept distinct per kind
    /// so subscriptions sharing a configured shard id never steal each other's envelopes.
    pub fn shard_id(&self, configured: &str) -> String {
        format!("{}_{}", configured, self.as_str())
    }
}

impl fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TelemetryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logs" => Ok(TelemetryKind::Logs),
            "metrics" => Ok(TelemetryKind::Metrics),
            "traces" => Ok(TelemetryKind::Traces),
            other => Err(format!("unknown telemetry kind '{}'", other)),
        }
    }
}
