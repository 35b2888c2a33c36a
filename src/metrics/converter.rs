//! Envelope converter metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct ConverterMetrics;

impl ConverterMetrics {
    pub fn record_converted(log_records: usize, metric_points: usize) {
        ::metrics::counter!(phase_metric!(counter, "converter", "log_records"))
            .increment(log_records as u64);
        ::metrics::counter!(phase_metric!(counter, "converter", "metric_points"))
            .increment(metric_points as u64);
    }

    /// An envelope whose payload kind has no destination mapping.
    pub fn record_dropped(payload_kind: &'static str) {
        ::metrics::counter!(
            phase_metric!(counter, "converter", "envelopes_dropped"),
            "payload" => payload_kind
        )
        .increment(1);
    }
}

impl PhaseMetrics for ConverterMetrics {
    fn register_metrics() {
        use metrics::describe_counter;

        describe_counter!(
            phase_metric!(counter, "converter", "log_records"),
            "Total number of log records produced from envelopes"
        );
        describe_counter!(
            phase_metric!(counter, "converter", "metric_points"),
            "Total number of metric data points produced from envelopes"
        );
        describe_counter!(
            phase_metric!(counter, "converter", "envelopes_dropped"),
            "Total number of envelopes dropped for an unsupported payload kind"
        );
    }

    fn phase_name() -> &'static str {
        "converter"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "converter", "log_records"),
                metric_type: MetricType::Counter,
                help: "Total number of log records produced from envelopes",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "converter", "metric_points"),
                metric_type: MetricType::Counter,
                help: "Total number of metric data points produced from envelopes",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "converter", "envelopes_dropped"),
                metric_type: MetricType::Counter,
                help: "Total number of envelopes dropped for an unsupported payload kind",
                labels: vec!["payload"],
            },
        ]
    }
}
