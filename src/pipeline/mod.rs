// Receive pipeline: gateway batches -> conversion -> downstream sink

pub mod backoff;
pub mod converter;
pub mod receiver;

pub use backoff::ReconnectPolicy;
pub use converter::{convert, Conversion};
pub use receiver::{Receiver, ReceiverState};
