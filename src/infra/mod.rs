// Adapters behind the ports in app::ports

pub mod authorizing_transport;
pub mod http_client;
pub mod ndjson_sink;
pub mod rlp_gateway;
pub mod sse;
pub mod tracing_sink;
pub mod uaa_client;

pub use authorizing_transport::AuthorizingTransport;
pub use http_client::{build_client, ReqwestTransport};
pub use ndjson_sink::NdjsonFileSink;
pub use rlp_gateway::GatewayStreamFactory;
pub use tracing_sink::TracingSink;
pub use uaa_client::{uaa_token_source, UaaClient};
