//! Bearer credentials for the gateway connection

pub mod token_source;

pub use token_source::CachingTokenSource;
