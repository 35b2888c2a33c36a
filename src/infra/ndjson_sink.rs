use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::app::ports::TelemetrySink;
use crate::domain::{LogRecord, MetricPoint, TelemetryBatch, TelemetryKind};
use crate::error::SinkError;

/// One output line: a single record tagged with its signal type.
#[derive(Serialize)]
#[serde(tag = "signal", rename_all = "lowercase")]
enum OutputLine<'a> {
    Log {
        kind: TelemetryKind,
        #[serde(flatten)]
        record: &'a LogRecord,
    },
    Metric {
        kind: TelemetryKind,
        #[serde(flatten)]
        point: &'a MetricPoint,
    },
}

/// Appends every received record to a newline-delimited JSON file.
///
/// One file may be shared by several receivers; writes of a batch are not
/// interleaved with other batches.
pub struct NdjsonFileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl NdjsonFileSink {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
                debug!(dir = %parent.display(), "created output directory");
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn render(batch: &TelemetryBatch) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for record in &batch.logs {
        out.push_str(&serde_json::to_string(&OutputLine::Log { kind: batch.kind, record })?);
        out.push('\n');
    }
    for point in &batch.metrics {
        out.push_str(&serde_json::to_string(&OutputLine::Metric { kind: batch.kind, point })?);
        out.push('\n');
    }
    Ok(out)
}

#[async_trait]
impl TelemetrySink for NdjsonFileSink {
    async fn push(&self, batch: TelemetryBatch) -> Result<(), SinkError> {
        let lines = render(&batch)?;
        let mut file = self.file.lock().await;
        file.write_all(lines.as_bytes()).await?;
        file.flush().await?;
        debug!(path = %self.path.display(), records = batch.record_count(), "wrote batch");
        Ok(())
    }
}
