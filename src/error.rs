use thiserror::Error;

use crate::pipeline::receiver::ReceiverState;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The only failure a token source reports. The reason is for logs and never
/// travels past the authorizing transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("authentication token unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("obtaining authentication token for the request")]
    AuthorizationFailed,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Building a `reqwest::Client` from TLS settings. Always fatal.
#[derive(Error, Debug)]
pub enum ClientBuildError {
    #[error("reading CA file '{path}': {source}")]
    CaFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CA certificate: {0}")]
    Certificate(#[source] reqwest::Error),

    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Server-sent-events framing violations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SseError {
    #[error("line is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("creating HTTP client for RLP gateway: {0}")]
    ClientBuild(#[from] ClientBuildError),

    #[error("invalid gateway request: {0}")]
    Request(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("gateway responded with status {status}")]
    Status { status: u16 },

    #[error("malformed stream framing: {0}")]
    Framing(String),

    #[error("malformed envelope batch: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("consumer rejected batch: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum ReceiverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("creating HTTP client for UAA: {0}")]
    IdentityClient(#[source] ClientBuildError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("receiver already started (state: {0})")]
    AlreadyStarted(ReceiverState),
}

pub type Result<T> = std::result::Result<T, ReceiverError>;
