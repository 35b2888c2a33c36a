pub mod ports;
pub mod receive_use_case;

pub use receive_use_case::{subscriptions, ReceiveUseCase, Subscription};
