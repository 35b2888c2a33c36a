/// Configuration defaults shared by the config layer and the CLI

pub const DEFAULT_UAA_USERNAME: &str = "admin";
pub const DEFAULT_RLP_GATEWAY_SHARD_ID: &str = "opentelemetry";
pub const DEFAULT_URL: &str = "https://localhost";

// Environment overrides (applied after .env is loaded)
pub const ENV_UAA_PASSWORD: &str = "CF_RECEIVER_UAA_PASSWORD";
pub const ENV_RLP_ENDPOINT: &str = "CF_RECEIVER_RLP_ENDPOINT";
pub const ENV_METRICS_ADDR: &str = "CF_RECEIVER_METRICS_ADDR";

/// Path of the RLP gateway's server-sent-events read API
pub const RLP_READ_PATH: &str = "/v2/read";

/// Path of the UAA token endpoint
pub const UAA_TOKEN_PATH: &str = "/oauth/token";

/// SSE event names the gateway sends besides data frames
pub const SSE_EVENT_HEARTBEAT: &str = "heartbeat";
pub const SSE_EVENT_CLOSING: &str = "closing";
