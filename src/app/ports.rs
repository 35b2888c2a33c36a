use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{Envelope, TelemetryBatch, TelemetryKind};
use crate::error::{SinkError, StreamError, TokenError, TransportError};

// Auth-side ports

/// A bearer credential as issued by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
    /// Full `Authorization` header value, e.g. `bearer eyJ...`.
    pub token: String,
    /// Lifetime reported by the provider; `None` when it did not say.
    pub expires_in: Option<Duration>,
}

/// One round trip to the identity endpoint.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn fetch_token(&self) -> Result<IssuedToken, TokenError>;
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn provide_token(&self) -> Result<String, TokenError>;
}

#[async_trait]
pub trait RequestTransport: Send + Sync {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, TransportError>;
}

// Stream-side ports

/// Outcome of one pull from an envelope stream.
#[derive(Debug)]
pub enum StreamPull {
    Batch(Vec<Envelope>),
    /// The server ended the stream cleanly.
    Closed,
    Failed(StreamError),
}

/// Lazy, non-restartable sequence of envelope batches. Once it yields `Closed` or
/// `Failed` every later pull yields `Closed`.
#[async_trait]
pub trait EnvelopeStream: Send {
    async fn next_batch(&mut self) -> StreamPull;
}

#[async_trait]
pub trait StreamFactory: Send + Sync {
    async fn create_stream(
        &self,
        kind: TelemetryKind,
    ) -> Result<Box<dyn EnvelopeStream>, StreamError>;
}

// Downstream port

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn push(&self, batch: TelemetryBatch) -> Result<(), SinkError>;
}
