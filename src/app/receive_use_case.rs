use std::sync::Arc;
use tracing::{info, warn};

use crate::app::ports::{TelemetrySink, TokenSource};
use crate::config::Config;
use crate::domain::{Selector, TelemetryKind};
use crate::error::Result;
use crate::infra::uaa_client::uaa_token_source;
use crate::pipeline::{Receiver, ReceiverState, ReconnectPolicy};

/// What one receiver asks the gateway for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub kind: TelemetryKind,
    pub shard_id: String,
    pub selectors: &'static [Selector],
}

pub fn subscriptions(config: &Config) -> Vec<Subscription> {
    config
        .telemetry
        .iter()
        .map(|kind| Subscription {
            kind: *kind,
            shard_id: kind.shard_id(&config.rlp_gateway.shard_id),
            selectors: kind.selectors(),
        })
        .collect()
}

/// Runs one receiver per configured telemetry kind. All receivers share a single
/// token source, so they share the cached credential too.
pub struct ReceiveUseCase {
    receivers: Vec<Receiver>,
}

impl ReceiveUseCase {
    pub fn from_config(config: &Config, sink: Arc<dyn TelemetrySink>) -> Result<Self> {
        let tokens = uaa_token_source(&config.uaa)?;
        Ok(Self::with_token_source(config, tokens, sink))
    }

    pub fn with_token_source(
        config: &Config,
        tokens: Arc<dyn TokenSource>,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        let policy = ReconnectPolicy::new(&config.reconnect);
        let mut kinds: Vec<TelemetryKind> = Vec::new();
        for kind in &config.telemetry {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        let receivers = kinds
            .into_iter()
            .map(|kind| {
                Receiver::new(
                    kind,
                    config.rlp_gateway.clone(),
                    tokens.clone(),
                    sink.clone(),
                    policy.clone(),
                )
            })
            .collect();
        Self { receivers }
    }

    pub fn receivers(&self) -> &[Receiver] {
        &self.receivers
    }

    pub fn states(&self) -> Vec<(TelemetryKind, ReceiverState)> {
        self.receivers.iter().map(|r| (r.kind(), r.state())).collect()
    }

    /// Start every receiver. If one fails to start, those already running are
    /// shut down again and the error is returned.
    pub async fn start(&self) -> Result<()> {
        for (i, receiver) in self.receivers.iter().enumerate() {
            if let Err(e) = receiver.start().await {
                warn!(kind = %receiver.kind(), error = %e, "aborting startup");
                for started in &self.receivers[..i] {
                    started.shutdown().await?;
                }
                return Err(e);
            }
        }
        info!(receivers = self.receivers.len(), "all receivers started");
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        for receiver in &self.receivers {
            receiver.shutdown().await?;
        }
        Ok(())
    }
}
