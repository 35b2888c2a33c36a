//! Receiver loop metrics
//!
//! Every metric carries a `kind` label (`logs`, `metrics`, `traces`).

use crate::domain::TelemetryKind;
use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct ReceiverMetrics;

impl ReceiverMetrics {
    pub fn record_stream_opened(kind: TelemetryKind) {
        ::metrics::counter!(
            phase_metric!(counter, "receiver", "streams_opened"),
            "kind" => kind.as_str()
        )
        .increment(1);
    }

    /// 1 while a gateway stream is open for `kind`, 0 otherwise.
    pub fn record_stream_active(kind: TelemetryKind, active: bool) {
        ::metrics::gauge!(
            phase_metric!(gauge, "receiver", "stream_active"),
            "kind" => kind.as_str()
        )
        .set(if active { 1.0 } else { 0.0 });
    }

    pub fn record_stream_failure(kind: TelemetryKind) {
        ::metrics::counter!(
            phase_metric!(counter, "receiver", "stream_failures"),
            "kind" => kind.as_str()
        )
        .increment(1);
    }

    pub fn record_reconnect(kind: TelemetryKind, delay_secs: f64) {
        ::metrics::counter!(
            phase_metric!(counter, "receiver", "reconnects"),
            "kind" => kind.as_str()
        )
        .increment(1);
        ::metrics::histogram!(
            phase_metric!(histogram, "receiver", "backoff_seconds"),
            "kind" => kind.as_str()
        )
        .record(delay_secs);
    }

    pub fn record_batch_pushed(kind: TelemetryKind, records: usize) {
        ::metrics::counter!(
            phase_metric!(counter, "receiver", "batches_pushed"),
            "kind" => kind.as_str()
        )
        .increment(1);
        ::metrics::counter!(
            phase_metric!(counter, "receiver", "records_pushed"),
            "kind" => kind.as_str()
        )
        .increment(records as u64);
    }

    pub fn record_push_error(kind: TelemetryKind) {
        ::metrics::counter!(
            phase_metric!(counter, "receiver", "push_errors"),
            "kind" => kind.as_str()
        )
        .increment(1);
    }
}

impl PhaseMetrics for ReceiverMetrics {
    fn register_metrics() {
        use metrics::{describe_counter, describe_gauge, describe_histogram};

        describe_counter!(
            phase_metric!(counter, "receiver", "streams_opened"),
            "Total number of gateway streams opened"
        );
        describe_gauge!(
            phase_metric!(gauge, "receiver", "stream_active"),
            "Whether a gateway stream is currently open (1) or not (0)"
        );
        describe_counter!(
            phase_metric!(counter, "receiver", "stream_failures"),
            "Total number of gateway streams that ended with an error"
        );
        describe_counter!(
            phase_metric!(counter, "receiver", "reconnects"),
            "Total number of reconnect attempts"
        );
        describe_counter!(
            phase_metric!(counter, "receiver", "batches_pushed"),
            "Total number of converted batches accepted downstream"
        );
        describe_counter!(
            phase_metric!(counter, "receiver", "records_pushed"),
            "Total number of records accepted downstream"
        );
        describe_counter!(
            phase_metric!(counter, "receiver", "push_errors"),
            "Total number of batches dropped because the consumer rejected them"
        );
        describe_histogram!(
            phase_metric!(histogram, "receiver", "backoff_seconds"),
            "Delay applied before each reconnect in seconds"
        );
    }

    fn phase_name() -> &'static str {
        "receiver"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        let counter = |name: &'static str, help: &'static str| MetricDoc {
            name,
            metric_type: MetricType::Counter,
            help,
            labels: vec!["kind"],
        };
        vec![
            counter(
                phase_metric!(counter, "receiver", "streams_opened"),
                "Total number of gateway streams opened",
            ),
            MetricDoc {
                name: phase_metric!(gauge, "receiver", "stream_active"),
                metric_type: MetricType::Gauge,
                help: "Whether a gateway stream is currently open (1) or not (0)",
                labels: vec!["kind"],
            },
            counter(
                phase_metric!(counter, "receiver", "stream_failures"),
                "Total number of gateway streams that ended with an error",
            ),
            counter(
                phase_metric!(counter, "receiver", "reconnects"),
                "Total number of reconnect attempts",
            ),
            counter(
                phase_metric!(counter, "receiver", "batches_pushed"),
                "Total number of converted batches accepted downstream",
            ),
            counter(
                phase_metric!(counter, "receiver", "records_pushed"),
                "Total number of records accepted downstream",
            ),
            counter(
                phase_metric!(counter, "receiver", "push_errors"),
                "Total number of batches dropped because the consumer rejected them",
            ),
            MetricDoc {
                name: phase_metric!(histogram, "receiver", "backoff_seconds"),
                metric_type: MetricType::Histogram,
                help: "Delay applied before each reconnect in seconds",
                labels: vec!["kind"],
            },
        ]
    }
}
