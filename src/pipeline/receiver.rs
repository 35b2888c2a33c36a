//! Per-kind receiver: pulls envelope batches from the gateway, converts them and
//! pushes the result downstream, reconnecting with backoff until shut down.
//!
//! Lifecycle:
//!
//! ```text
//! Idle -> Starting -> Streaming <-> Reconnecting
//!            |             \            /
//!          Failed           -> Stopping -> Stopped
//! ```

use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::ports::{EnvelopeStream, StreamFactory, StreamPull, TelemetrySink, TokenSource};
use crate::config::GatewayConfig;
use crate::domain::{Envelope, TelemetryBatch, TelemetryKind};
use crate::error::{ReceiverError, Result, StreamError};
use crate::infra::rlp_gateway::GatewayStreamFactory;
use crate::metrics::ReceiverMetrics;
use crate::pipeline::backoff::ReconnectPolicy;
use crate::pipeline::converter::convert;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Idle,
    Starting,
    Streaming,
    Reconnecting,
    Stopping,
    Stopped,
    Failed,
}

impl ReceiverState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiverState::Idle => "idle",
            ReceiverState::Starting => "starting",
            ReceiverState::Streaming => "streaming",
            ReceiverState::Reconnecting => "reconnecting",
            ReceiverState::Stopping => "stopping",
            ReceiverState::Stopped => "stopped",
            ReceiverState::Failed => "failed",
        }
    }
}

impl fmt::Display for ReceiverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the stream factory comes from. The gateway variant defers building the
/// HTTP client to `start()` so construction errors surface there.
enum FactorySource {
    Gateway {
        config: GatewayConfig,
        tokens: Arc<dyn TokenSource>,
    },
    Ready(Arc<dyn StreamFactory>),
}

impl FactorySource {
    fn build(&self) -> std::result::Result<Arc<dyn StreamFactory>, StreamError> {
        match self {
            FactorySource::Gateway { config, tokens } => {
                Ok(Arc::new(GatewayStreamFactory::from_config(config, tokens.clone())?))
            }
            FactorySource::Ready(factory) => Ok(factory.clone()),
        }
    }
}

pub struct Receiver {
    kind: TelemetryKind,
    source: FactorySource,
    sink: Arc<dyn TelemetrySink>,
    policy: ReconnectPolicy,
    state: Arc<watch::Sender<ReceiverState>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Receiver {
    /// Receiver streaming from the RLP gateway described by `gateway`, authorized
    /// through the shared `tokens`.
    pub fn new(
        kind: TelemetryKind,
        gateway: GatewayConfig,
        tokens: Arc<dyn TokenSource>,
        sink: Arc<dyn TelemetrySink>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self::with_source(kind, FactorySource::Gateway { config: gateway, tokens }, sink, policy)
    }

    pub fn with_stream_factory(
        kind: TelemetryKind,
        factory: Arc<dyn StreamFactory>,
        sink: Arc<dyn TelemetrySink>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self::with_source(kind, FactorySource::Ready(factory), sink, policy)
    }

    fn with_source(
        kind: TelemetryKind,
        source: FactorySource,
        sink: Arc<dyn TelemetrySink>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (state, _) = watch::channel(ReceiverState::Idle);
        Self {
            kind,
            source,
            sink,
            policy,
            state: Arc::new(state),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> TelemetryKind {
        self.kind
    }

    pub fn state(&self) -> ReceiverState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ReceiverState> {
        self.state.subscribe()
    }

    /// Build the stream factory and spawn the streaming task.
    ///
    /// Only construction errors are returned; once running, every failure is
    /// handled by reconnecting.
    pub async fn start(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        let current = self.state();
        if current != ReceiverState::Idle {
            return Err(ReceiverError::AlreadyStarted(current));
        }
        self.state.send_replace(ReceiverState::Starting);

        let factory = match self.source.build() {
            Ok(factory) => factory,
            Err(e) => {
                error!(kind = %self.kind, error = %e, "receiver failed to start");
                self.state.send_replace(ReceiverState::Failed);
                return Err(e.into());
            }
        };

        self.state.send_replace(ReceiverState::Streaming);
        let worker = Worker {
            kind: self.kind,
            factory,
            sink: self.sink.clone(),
            policy: self.policy.clone(),
            state: self.state.clone(),
            cancel: self.cancel.clone(),
        };
        *task = Some(tokio::spawn(worker.run()));
        info!(kind = %self.kind, "receiver started");
        Ok(())
    }

    /// Cancel in-flight work and wait for the streaming task to end. A no-op when
    /// the receiver is not running.
    pub async fn shutdown(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        let handle = match task.take() {
            Some(handle) => handle,
            None => return Ok(()),
        };

        self.state.send_replace(ReceiverState::Stopping);
        self.cancel.cancel();
        if let Err(e) = handle.await {
            if e.is_panic() {
                error!(kind = %self.kind, "receiver task panicked");
            }
        }
        self.state.send_replace(ReceiverState::Stopped);
        info!(kind = %self.kind, "receiver stopped");
        Ok(())
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Worker {
    kind: TelemetryKind,
    factory: Arc<dyn StreamFactory>,
    sink: Arc<dyn TelemetrySink>,
    policy: ReconnectPolicy,
    state: Arc<watch::Sender<ReceiverState>>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        let mut attempt: u32 = 0;

        loop {
            let delivered = tokio::select! {
                _ = self.cancel.cancelled() => break,
                delivered = self.stream_once() => delivered,
            };
            if delivered {
                attempt = 0;
            }

            self.transition(ReceiverState::Reconnecting);
            let delay = self.policy.delay(attempt);
            ReceiverMetrics::record_reconnect(self.kind, delay.as_secs_f64());
            info!(
                kind = %self.kind,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "reconnecting to gateway"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            attempt = attempt.saturating_add(1);
        }

        ReceiverMetrics::record_stream_active(self.kind, false);
        debug!(kind = %self.kind, "receiver loop exited");
    }

    /// Never overwrite `Stopping`; shutdown owns the state from there.
    fn transition(&self, next: ReceiverState) {
        self.state.send_if_modified(|current| {
            if *current == ReceiverState::Stopping || *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Drain one stream. Returns whether it delivered at least one batch.
    ///
    /// The state only moves to `Streaming` once the factory hands back a stream.
    async fn stream_once(&self) -> bool {
        let mut stream: Box<dyn EnvelopeStream> =
            match self.factory.create_stream(self.kind).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(kind = %self.kind, error = %e, "creating envelope stream");
                    ReceiverMetrics::record_stream_failure(self.kind);
                    return false;
                }
            };
        self.transition(ReceiverState::Streaming);
        ReceiverMetrics::record_stream_opened(self.kind);
        ReceiverMetrics::record_stream_active(self.kind, true);

        let mut delivered = false;
        loop {
            match stream.next_batch().await {
                StreamPull::Batch(envelopes) => {
                    delivered = true;
                    self.deliver(&envelopes).await;
                }
                StreamPull::Closed => {
                    info!(kind = %self.kind, "gateway closed the stream");
                    break;
                }
                StreamPull::Failed(e) => {
                    warn!(kind = %self.kind, error = %e, "envelope stream failed");
                    ReceiverMetrics::record_stream_failure(self.kind);
                    break;
                }
            }
        }
        ReceiverMetrics::record_stream_active(self.kind, false);
        delivered
    }

    async fn deliver(&self, envelopes: &[Envelope]) {
        let conversion = convert(envelopes);
        if conversion.is_empty() {
            debug!(
                kind = %self.kind,
                envelopes = envelopes.len(),
                dropped = conversion.dropped,
                "batch produced no records"
            );
            return;
        }

        let batch = TelemetryBatch {
            kind: self.kind,
            logs: conversion.logs,
            metrics: conversion.metrics,
        };
        let records = batch.record_count();
        match self.sink.push(batch).await {
            Ok(()) => ReceiverMetrics::record_batch_pushed(self.kind, records),
            Err(e) => {
                warn!(
                    kind = %self.kind,
                    records,
                    error = %e,
                    "consumer rejected batch, dropping it"
                );
                ReceiverMetrics::record_push_error(self.kind);
            }
        }
    }
}
