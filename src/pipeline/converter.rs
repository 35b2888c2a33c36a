//! Envelope → destination telemetry mapping.
//!
//! Pure; the only side effect is the converter counters.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use tracing::trace;

use crate::domain::envelope::{CounterPayload, GaugePayload, LogPayload, LogStream};
use crate::domain::{Envelope, LogRecord, MetricPoint, MetricValue, Payload, Resource, Severity};
use crate::metrics::ConverterMetrics;

/// Tag whose value, when present, prefixes metric names.
const ORIGIN_TAG: &str = "origin";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Conversion {
    pub logs: Vec<LogRecord>,
    pub metrics: Vec<MetricPoint>,
    /// Envelopes whose payload kind has no destination mapping.
    pub dropped: usize,
}

impl Conversion {
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty() && self.metrics.is_empty()
    }
}

pub fn convert(envelopes: &[Envelope]) -> Conversion {
    let mut out = Conversion::default();

    for envelope in envelopes {
        match &envelope.payload {
            Payload::Log(log) => out.logs.push(log_record(envelope, log)),
            Payload::Counter(counter) => out.metrics.push(counter_point(envelope, counter)),
            Payload::Gauge(gauge) => out.metrics.extend(gauge_points(envelope, gauge)),
            Payload::Timer(_) | Payload::Event(_) | Payload::Unknown => {
                trace!(
                    source_id = %envelope.source_id,
                    payload = envelope.payload_kind(),
                    "dropping envelope without destination mapping"
                );
                ConverterMetrics::record_dropped(envelope.payload_kind());
                out.dropped += 1;
            }
        }
    }

    ConverterMetrics::record_converted(out.logs.len(), out.metrics.len());
    out
}

fn timestamp(envelope: &Envelope) -> DateTime<Utc> {
    Utc.timestamp_nanos(envelope.timestamp)
}

fn resource(envelope: &Envelope) -> Resource {
    Resource {
        source_id: envelope.source_id.clone(),
        instance_id: envelope.instance_id.clone(),
    }
}

fn metric_name(envelope: &Envelope, name: &str) -> String {
    match envelope.tags.get(ORIGIN_TAG) {
        Some(origin) if !origin.is_empty() => format!("{}.{}", origin, name),
        _ => name.to_string(),
    }
}

fn attributes(envelope: &Envelope) -> BTreeMap<String, String> {
    envelope.tags.clone()
}

fn log_record(envelope: &Envelope, log: &LogPayload) -> LogRecord {
    let (severity, text) = match log.stream {
        LogStream::Out => (Severity::Info, "OUT"),
        LogStream::Err => (Severity::Error, "ERR"),
    };
    LogRecord {
        timestamp: timestamp(envelope),
        body: String::from_utf8_lossy(&log.payload).into_owned(),
        severity,
        severity_text: Some(text.to_string()),
        attributes: attributes(envelope),
        resource: resource(envelope),
    }
}

fn counter_point(envelope: &Envelope, counter: &CounterPayload) -> MetricPoint {
    MetricPoint {
        name: metric_name(envelope, &counter.name),
        unit: None,
        value: MetricValue::Sum {
            value: counter.total as f64,
            monotonic: true,
            cumulative: true,
        },
        timestamp: timestamp(envelope),
        attributes: attributes(envelope),
        resource: resource(envelope),
    }
}

fn gauge_points(envelope: &Envelope, gauge: &GaugePayload) -> Vec<MetricPoint> {
    gauge
        .metrics
        .iter()
        .map(|(name, value)| MetricPoint {
            name: metric_name(envelope, name),
            unit: Some(value.unit.clone()).filter(|u| !u.is_empty()),
            value: MetricValue::Gauge { value: value.value },
            timestamp: timestamp(envelope),
            attributes: attributes(envelope),
            resource: resource(envelope),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::{EventPayload, GaugeValue, TimerPayload};

    fn envelope(payload: Payload) -> Envelope {
        Envelope {
            source_id: "app-guid".into(),
            instance_id: "0".into(),
            timestamp: 1_700_000_000_123_456_789,
            tags: BTreeMap::new(),
            payload,
        }
    }

    #[test]
    fn test_counter_carries_total_and_tags() {
        let mut env = envelope(Payload::Counter(CounterPayload {
            name: "requests".into(),
            delta: 2,
            total: 42,
        }));
        env.tags.insert("unit".into(), "bytes".into());

        let out = convert(&[env]);

        assert_eq!(out.metrics.len(), 1);
        let point = &out.metrics[0];
        assert_eq!(point.name, "requests");
        assert_eq!(point.value.as_f64(), 42.0);
        assert!(matches!(point.value, MetricValue::Sum { monotonic: true, cumulative: true, .. }));
        assert_eq!(point.attributes.get("unit").map(String::as_str), Some("bytes"));
        assert_eq!(point.resource.source_id, "app-guid");
        assert_eq!(point.timestamp.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_gauge_yields_point_per_metric() {
        let mut metrics = BTreeMap::new();
        metrics.insert("memory".to_string(), GaugeValue { unit: "bytes".into(), value: 1024.0 });
        metrics.insert("cpu".to_string(), GaugeValue { unit: String::new(), value: 0.5 });
        let mut env = envelope(Payload::Gauge(GaugePayload { metrics }));
        env.tags.insert("origin".into(), "rep".into());

        let out = convert(&[env]);

        let names: Vec<_> = out.metrics.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["rep.cpu", "rep.memory"]);
        assert_eq!(out.metrics[0].unit, None);
        assert_eq!(out.metrics[1].unit.as_deref(), Some("bytes"));
        assert!(matches!(out.metrics[1].value, MetricValue::Gauge { value } if value == 1024.0));
    }

    #[test]
    fn test_log_severity_follows_stream() {
        let out = convert(&[
            envelope(Payload::Log(LogPayload {
                payload: b"hello".to_vec(),
                stream: LogStream::Out,
            })),
            envelope(Payload::Log(LogPayload {
                payload: b"boom".to_vec(),
                stream: LogStream::Err,
            })),
        ]);

        assert_eq!(out.logs.len(), 2);
        assert_eq!(out.logs[0].body, "hello");
        assert_eq!(out.logs[0].severity, Severity::Info);
        assert_eq!(out.logs[0].severity_text.as_deref(), Some("OUT"));
        assert_eq!(out.logs[1].severity, Severity::Error);
        assert_eq!(out.logs[1].severity_text.as_deref(), Some("ERR"));
    }

    #[test]
    fn test_log_body_is_lossy_utf8() {
        let out = convert(&[envelope(Payload::Log(LogPayload {
            payload: vec![b'o', b'k', 0xff],
            stream: LogStream::Out,
        }))]);
        assert!(out.logs[0].body.starts_with("ok"));
    }

    #[test]
    fn test_unmapped_payloads_are_dropped() {
        let out = convert(&[
            envelope(Payload::Unknown),
            envelope(Payload::Timer(TimerPayload { name: "http".into(), start: 1, stop: 2 })),
            envelope(Payload::Event(EventPayload { title: "t".into(), body: "b".into() })),
        ]);

        assert!(out.is_empty());
        assert_eq!(out.dropped, 3);
    }
}
