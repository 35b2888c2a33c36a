//! Registers every phase's metrics and detects naming conflicts early.

use crate::metrics::{MetricDoc, PhaseMetrics};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn, Level};

type Registry = HashMap<&'static str, (&'static str, MetricDoc)>;

pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<super::auth::AuthMetrics>(&mut all_metrics);
    register_phase_metrics::<super::converter::ConverterMetrics>(&mut all_metrics);
    register_phase_metrics::<super::receiver::ReceiverMetrics>(&mut all_metrics);

    info!("Registered {} total metrics across all phases", all_metrics.len());
    if tracing::enabled!(Level::DEBUG) {
        for line in metrics_summary(&all_metrics) {
            debug!("{}", line);
        }
    }
}

fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut Registry) {
    T::register_metrics();
    let phase_name = T::phase_name();

    for doc in T::metrics_documentation() {
        if let Some((owner, _)) = all_metrics.get(doc.name) {
            warn!(
                "Metric name conflict detected: '{}' is defined in both '{}' and '{}'",
                doc.name, owner, phase_name
            );
        } else {
            all_metrics.insert(doc.name, (phase_name, doc));
        }
    }
}

/// One line per phase followed by one line per metric, phases and names sorted.
fn metrics_summary(all_metrics: &Registry) -> Vec<String> {
    let mut by_phase: BTreeMap<&str, Vec<&MetricDoc>> = BTreeMap::new();
    for (_, doc) in all_metrics.values() {
        by_phase.entry(extract_phase_from_metric_name(doc.name)).or_default().push(doc);
    }

    let mut lines = Vec::new();
    for (phase, mut docs) in by_phase {
        docs.sort_by_key(|doc| doc.name);
        lines.push(format!("Phase '{}': {} metrics", phase, docs.len()));
        for doc in docs {
            lines.push(format!(
                "  - {} ({:?}) [{}]: {}",
                doc.name,
                doc.metric_type,
                doc.labels.join(","),
                doc.help
            ));
        }
    }
    lines
}

/// Extract the phase from a metric name (e.g. "cfr_auth_token_fetches_success_total" -> "auth")
fn extract_phase_from_metric_name(metric_name: &str) -> &str {
    if let Some(stripped) = metric_name.strip_prefix("cfr_") {
        if let Some(next_underscore) = stripped.find('_') {
            return &stripped[..next_underscore];
        }
    }
    "unknown"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{AuthMetrics, ConverterMetrics, ReceiverMetrics};

    #[test]
    fn test_extract_phase_from_metric_name() {
        assert_eq!(
            extract_phase_from_metric_name("cfr_auth_token_fetches_success_total"),
            "auth"
        );
        assert_eq!(extract_phase_from_metric_name("cfr_receiver_backoff_seconds"), "receiver");
        assert_eq!(extract_phase_from_metric_name("invalid_metric_name"), "unknown");
    }

    #[test]
    fn test_every_metric_lives_under_its_phase() {
        let phases = [
            (AuthMetrics::phase_name(), AuthMetrics::metrics_documentation()),
            (ConverterMetrics::phase_name(), ConverterMetrics::metrics_documentation()),
            (ReceiverMetrics::phase_name(), ReceiverMetrics::metrics_documentation()),
        ];
        for (phase, docs) in phases {
            for doc in docs {
                assert_eq!(extract_phase_from_metric_name(doc.name), phase);
            }
        }
    }

    #[test]
    fn test_metrics_summary_groups_by_phase() {
        let mut all_metrics = Registry::new();
        register_phase_metrics::<AuthMetrics>(&mut all_metrics);
        register_phase_metrics::<ReceiverMetrics>(&mut all_metrics);

        let lines = metrics_summary(&all_metrics);

        assert_eq!(lines[0], "Phase 'auth': 4 metrics");
        assert!(lines.contains(&"Phase 'receiver': 8 metrics".to_string()));
        let gauge_line = "  - cfr_receiver_stream_active (Gauge) [kind]: ";
        assert!(lines.iter().any(|l| l.starts_with(gauge_line)));
        assert_eq!(lines.len(), 2 + 4 + 8);
    }
}
