//! Gateway envelope model.
//!
//! The RLP gateway emits loggregator v2 envelopes in their protobuf-JSON form:
//! camelCase field names, 64-bit integers as strings and bytes as base64. The
//! wire structs here absorb those quirks and fold into [`Envelope`], whose
//! payload is a closed tagged union.

use base64::Engine;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// One unit of telemetry from the gateway. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "WireEnvelope")]
pub struct Envelope {
    pub source_id: String,
    pub instance_id: String,
    /// Nanoseconds since the Unix epoch.
    pub timestamp: i64,
    pub tags: BTreeMap<String, String>,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Log(LogPayload),
    Counter(CounterPayload),
    Gauge(GaugePayload),
    Timer(TimerPayload),
    Event(EventPayload),
    /// A payload kind this model does not know about.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Out,
    Err,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogPayload {
    pub payload: Vec<u8>,
    pub stream: LogStream,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CounterPayload {
    pub name: String,
    pub delta: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaugeValue {
    pub unit: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaugePayload {
    pub metrics: BTreeMap<String, GaugeValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimerPayload {
    pub name: String,
    pub start: i64,
    pub stop: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    pub title: String,
    pub body: String,
}

/// Body of one SSE `data:` frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvelopeBatch {
    #[serde(default)]
    pub batch: Vec<Envelope>,
}

impl Envelope {
    pub fn payload_kind(&self) -> &'static str {
        match self.payload {
            Payload::Log(_) => "log",
            Payload::Counter(_) => "counter",
            Payload::Gauge(_) => "gauge",
            Payload::Timer(_) => "timer",
            Payload::Event(_) => "event",
            Payload::Unknown => "unknown",
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Int64Repr {
    Number(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Uint64Repr {
    Number(u64),
    Text(String),
}

fn de_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match Int64Repr::deserialize(d)? {
        Int64Repr::Number(n) => Ok(n),
        Int64Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn de_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    match Uint64Repr::deserialize(d)? {
        Uint64Repr::Number(n) => Ok(n),
        Uint64Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct WireEnvelope {
    #[serde(deserialize_with = "de_i64")]
    timestamp: i64,
    #[serde(alias = "source_id")]
    source_id: String,
    #[serde(alias = "instance_id")]
    instance_id: String,
    tags: BTreeMap<String, String>,
    log: Option<WireLog>,
    counter: Option<WireCounter>,
    gauge: Option<WireGauge>,
    timer: Option<WireTimer>,
    event: Option<WireEvent>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireLog {
    payload: String,
    #[serde(rename = "type")]
    log_type: Option<serde_json::Value>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireCounter {
    name: String,
    #[serde(deserialize_with = "de_u64")]
    delta: u64,
    #[serde(deserialize_with = "de_u64")]
    total: u64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireGaugeValue {
    unit: String,
    value: f64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireGauge {
    metrics: BTreeMap<String, WireGaugeValue>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireTimer {
    name: String,
    #[serde(deserialize_with = "de_i64")]
    start: i64,
    #[serde(deserialize_with = "de_i64")]
    stop: i64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireEvent {
    title: String,
    body: String,
}

fn log_stream(log_type: Option<&serde_json::Value>) -> LogStream {
    match log_type {
        Some(serde_json::Value::String(s)) if s.eq_ignore_ascii_case("ERR") => LogStream::Err,
        Some(serde_json::Value::Number(n)) if n.as_u64() == Some(1) => LogStream::Err,
        _ => LogStream::Out,
    }
}

impl From<WireEnvelope> for Envelope {
    fn from(wire: WireEnvelope) -> Self {
        let payload = if let Some(log) = wire.log {
            // Payloads that are not valid base64 are kept verbatim.
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(log.payload.as_bytes())
                .unwrap_or_else(|_| log.payload.clone().into_bytes());
            Payload::Log(LogPayload {
                payload: bytes,
                stream: log_stream(log.log_type.as_ref()),
            })
        } else if let Some(counter) = wire.counter {
            Payload::Counter(CounterPayload {
                name: counter.name,
                delta: counter.delta,
                total: counter.total,
            })
        } else if let Some(gauge) = wire.gauge {
            Payload::Gauge(GaugePayload {
                metrics: gauge
                    .metrics
                    .into_iter()
                    .map(|(name, v)| (name, GaugeValue { unit: v.unit, value: v.value }))
                    .collect(),
            })
        } else if let Some(timer) = wire.timer {
            Payload::Timer(TimerPayload { name: timer.name, start: timer.start, stop: timer.stop })
        } else if let Some(event) = wire.event {
            Payload::Event(EventPayload { title: event.title, body: event.body })
        } else {
            Payload::Unknown
        };

        Envelope {
            source_id: wire.source_id,
            instance_id: wire.instance_id,
            timestamp: wire.timestamp,
            tags: wire.tags,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_counter_with_string_integers() {
        let env: Envelope = serde_json::from_value(json!({
            "timestamp": "1700000000000000000",
            "sourceId": "app-guid",
            "instanceId": "0",
            "tags": {"origin": "gorouter"},
            "counter": {"name": "requests", "delta": "3", "total": "42"}
        }))
        .unwrap();

        assert_eq!(env.timestamp, 1_700_000_000_000_000_000);
        assert_eq!(env.source_id, "app-guid");
        assert_eq!(
            env.payload,
            Payload::Counter(CounterPayload { name: "requests".into(), delta: 3, total: 42 })
        );
    }

    #[test]
    fn test_decode_log_payload_base64() {
        let env: Envelope = serde_json::from_value(json!({
            "timestamp": 5,
            "sourceId": "app",
            "log": {"payload": "aGVsbG8=", "type": "ERR"}
        }))
        .unwrap();

        match env.payload {
            Payload::Log(log) => {
                assert_eq!(log.payload, b"hello");
                assert_eq!(log.stream, LogStream::Err);
            }
            other => panic!("expected log payload, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_gauge_and_unknown() {
        let batch: EnvelopeBatch = serde_json::from_value(json!({
            "batch": [
                {
                    "sourceId": "a",
                    "gauge": {"metrics": {"cpu": {"unit": "percentage", "value": 12.5}}}
                },
                {"sourceId": "b", "span": {"name": "ignored"}}
            ]
        }))
        .unwrap();

        assert_eq!(batch.batch.len(), 2);
        assert_eq!(batch.batch[0].payload_kind(), "gauge");
        assert_eq!(batch.batch[1].payload, Payload::Unknown);
    }

    #[test]
    fn test_decode_rejects_non_numeric_timestamp() {
        let result: Result<Envelope, _> = serde_json::from_value(json!({"timestamp": "soon"}));
        assert!(result.is_err());
    }
}
