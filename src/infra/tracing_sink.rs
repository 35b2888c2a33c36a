use async_trait::async_trait;
use tracing::{debug, info};

use crate::app::ports::TelemetrySink;
use crate::domain::TelemetryBatch;
use crate::error::SinkError;

/// Consumer that only logs what it receives. Used when no output file is given.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl TelemetrySink for TracingSink {
    async fn push(&self, batch: TelemetryBatch) -> Result<(), SinkError> {
        info!(
            kind = %batch.kind,
            logs = batch.logs.len(),
            metrics = batch.metrics.len(),
            "received telemetry batch"
        );
        for record in &batch.logs {
            debug!(
                source_id = %record.resource.source_id,
                severity = ?record.severity,
                body = %record.body,
                "log record"
            );
        }
        for point in &batch.metrics {
            debug!(
                source_id = %point.resource.source_id,
                name = %point.name,
                value = point.value.as_f64(),
                "metric point"
            );
        }
        Ok(())
    }
}
