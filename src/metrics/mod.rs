//! Metrics for the receiver
//!
//! Each component defines its metrics in a dedicated submodule. Recording goes
//! through the `metrics` facade, so nothing is exported unless a recorder is
//! installed by [`init_metrics`].

pub mod auth;
pub mod converter;
pub mod receiver;
pub mod registry;

pub use auth::AuthMetrics;
pub use converter::ConverterMetrics;
pub use receiver::ReceiverMetrics;

use std::sync::Once;
use tracing::{info, warn};

use crate::constants;

static INIT: Once = Once::new();

/// Install the Prometheus exporter when `CF_RECEIVER_METRICS_ADDR` is set.
///
/// Idempotent. Without the variable, metrics calls stay no-ops.
pub fn init_metrics() {
    INIT.call_once(|| {
        let addr_str = match std::env::var(constants::ENV_METRICS_ADDR) {
            Ok(v) if !v.trim().is_empty() => v,
            _ => {
                info!("metrics exporter disabled ({} not set)", constants::ENV_METRICS_ADDR);
                return;
            }
        };

        let addr = match addr_str.parse::<std::net::SocketAddr>() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Invalid metrics addr '{}': {}", addr_str, e);
                return;
            }
        };

        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            Ok(()) => {
                info!("Prometheus HTTP exporter started at http://{}/metrics", addr);
                registry::register_all_metrics();
            }
            Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
        }
    });
}

/// Implemented by each component's metrics collection.
pub trait PhaseMetrics {
    /// Describe all metrics of this phase to the installed recorder.
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// Metric names follow `cfr_{phase}_{metric_name}[_total]`.
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("cfr_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("cfr_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("cfr_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
