use crate::app::ports::{RequestTransport, TokenSource};
use crate::error::TransportError;
use crate::metrics::AuthMetrics;
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::sync::Arc;
use tracing::error;

/// Stamps a fresh bearer token on every request before handing it to `inner`.
///
/// Token failures never reach the network and surface only as
/// [`TransportError::AuthorizationFailed`]; the detail is logged here.
pub struct AuthorizingTransport<T> {
    tokens: Arc<dyn TokenSource>,
    inner: T,
}

impl<T: RequestTransport> AuthorizingTransport<T> {
    pub fn new(tokens: Arc<dyn TokenSource>, inner: T) -> Self {
        Self { tokens, inner }
    }
}

#[async_trait]
impl<T: RequestTransport> RequestTransport for AuthorizingTransport<T> {
    async fn execute(
        &self,
        mut request: reqwest::Request,
    ) -> Result<reqwest::Response, TransportError> {
        let token = match self.tokens.provide_token().await {
            Ok(token) => token,
            Err(e) => {
                error!(url = %request.url(), error = %e, "fetching authentication token");
                AuthMetrics::record_authorization_failure();
                return Err(TransportError::AuthorizationFailed);
            }
        };

        let value = match HeaderValue::from_str(&token) {
            Ok(value) => value,
            Err(_) => {
                error!(url = %request.url(), "authentication token is not a valid header value");
                AuthMetrics::record_authorization_failure();
                return Err(TransportError::AuthorizationFailed);
            }
        };
        request.headers_mut().insert(AUTHORIZATION, value);

        self.inner.execute(request).await
    }
}
