pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;

// Layered boundaries: ports and use cases, adapters, and the receive pipeline
pub mod app;
pub mod auth;
pub mod infra;
pub mod pipeline;

// Domain data shapes shared across layers
pub mod domain;

pub use config::Config;
pub use error::{ReceiverError, Result};
pub use pipeline::{Receiver, ReceiverState};
