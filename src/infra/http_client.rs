use crate::app::ports::RequestTransport;
use crate::config::TlsConfig;
use crate::error::{ClientBuildError, TransportError};
use async_trait::async_trait;
use std::time::Duration;

/// Build a `reqwest::Client` honoring the TLS trust settings. `timeout` bounds whole
/// requests and must stay `None` for long-lived streams.
pub fn build_client(
    tls: &TlsConfig,
    timeout: Option<Duration>,
) -> Result<reqwest::Client, ClientBuildError> {
    let mut builder =
        reqwest::Client::builder().danger_accept_invalid_certs(tls.insecure_skip_verify);

    if let Some(path) = &tls.ca_file {
        let pem = std::fs::read(path).map_err(|source| ClientBuildError::CaFile {
            path: path.clone(),
            source,
        })?;
        let cert = reqwest::Certificate::from_pem(&pem).map_err(ClientBuildError::Certificate)?;
        builder = builder.add_root_certificate(cert);
    }

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder.build().map_err(ClientBuildError::Client)
}

/// Plain transport over a pooled `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RequestTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, TransportError> {
        Ok(self.client.execute(request).await?)
    }
}
