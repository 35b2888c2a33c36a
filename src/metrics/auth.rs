//! Token source and authorizing transport metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct AuthMetrics;

impl AuthMetrics {
    pub fn record_token_fetch(success: bool, duration_secs: f64) {
        if success {
            ::metrics::counter!(phase_metric!(counter, "auth", "token_fetches_success"))
                .increment(1);
        } else {
            ::metrics::counter!(phase_metric!(counter, "auth", "token_fetches_error")).increment(1);
        }
        ::metrics::histogram!(phase_metric!(histogram, "auth", "token_fetch_duration_seconds"))
            .record(duration_secs);
    }

    /// A request was not sent because no token could be obtained.
    pub fn record_authorization_failure() {
        ::metrics::counter!(phase_metric!(counter, "auth", "authorization_failures")).increment(1);
    }
}

impl PhaseMetrics for AuthMetrics {
    fn register_metrics() {
        use metrics::{describe_counter, describe_histogram};

        describe_counter!(
            phase_metric!(counter, "auth", "token_fetches_success"),
            "Total number of successful token fetches from the identity endpoint"
        );
        describe_counter!(
            phase_metric!(counter, "auth", "token_fetches_error"),
            "Total number of failed token fetches from the identity endpoint"
        );
        describe_counter!(
            phase_metric!(counter, "auth", "authorization_failures"),
            "Total number of outbound requests aborted for lack of a token"
        );
        describe_histogram!(
            phase_metric!(histogram, "auth", "token_fetch_duration_seconds"),
            "Duration of token fetches in seconds"
        );
    }

    fn phase_name() -> &'static str {
        "auth"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "auth", "token_fetches_success"),
                metric_type: MetricType::Counter,
                help: "Total number of successful token fetches from the identity endpoint",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "auth", "token_fetches_error"),
                metric_type: MetricType::Counter,
                help: "Total number of failed token fetches from the identity endpoint",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "auth", "authorization_failures"),
                metric_type: MetricType::Counter,
                help: "Total number of outbound requests aborted for lack of a token",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "auth", "token_fetch_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Duration of token fetches in seconds",
                labels: vec![],
            },
        ]
    }
}
