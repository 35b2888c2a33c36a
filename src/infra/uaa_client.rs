use crate::app::ports::{IdentityClient, IssuedToken, TokenSource};
use crate::auth::CachingTokenSource;
use crate::config::UaaConfig;
use crate::constants;
use crate::error::{ReceiverError, TokenError};
use crate::infra::http_client::build_client;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Client-credentials token fetch against a UAA identity server.
pub struct UaaClient {
    client: reqwest::Client,
    token_url: String,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl UaaClient {
    pub fn from_config(config: &UaaConfig) -> Result<Self, ReceiverError> {
        let client = build_client(&config.tls, Some(config.request_timeout()))
            .map_err(ReceiverError::IdentityClient)?;
        Ok(Self {
            client,
            token_url: format!(
                "{}{}",
                config.endpoint.trim_end_matches('/'),
                constants::UAA_TOKEN_PATH
            ),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

#[async_trait]
impl IdentityClient for UaaClient {
    async fn fetch_token(&self) -> Result<IssuedToken, TokenError> {
        let resp = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", "client_credentials"), ("response_type", "token")])
            .send()
            .await
            .map_err(|e| {
                TokenError::Unavailable(format!("requesting token from {}: {}", self.token_url, e))
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TokenError::Unavailable(format!(
                "identity endpoint {} returned status {}",
                self.token_url,
                status.as_u16()
            )));
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| TokenError::Unavailable(format!("malformed token response: {}", e)))?;
        issued_token(body)
    }
}

fn issued_token(body: TokenResponse) -> Result<IssuedToken, TokenError> {
    if body.access_token.is_empty() {
        return Err(TokenError::Unavailable("token response carried no access_token".into()));
    }
    let token_type = body
        .token_type
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "bearer".to_string());
    Ok(IssuedToken {
        token: format!("{} {}", token_type, body.access_token),
        expires_in: body.expires_in.map(Duration::from_secs),
    })
}

/// Token source for one UAA endpoint, meant to be shared by all receivers using it.
pub fn uaa_token_source(config: &UaaConfig) -> Result<Arc<dyn TokenSource>, ReceiverError> {
    let client = UaaClient::from_config(config)?;
    Ok(Arc::new(CachingTokenSource::new(client, config.refresh_skew())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url_joins_endpoint() {
        let config = UaaConfig {
            endpoint: "https://uaa.sys.example.com/".into(),
            password: "secret".into(),
            ..Default::default()
        };
        let client = UaaClient::from_config(&config).unwrap();
        assert_eq!(client.token_url, "https://uaa.sys.example.com/oauth/token");
    }

    #[test]
    fn test_issued_token_formats_header_value() {
        let raw = r#"{"access_token":"abc","token_type":"bearer","expires_in":599}"#;
        let body: TokenResponse = serde_json::from_str(raw).unwrap();
        let issued = issued_token(body).unwrap();
        assert_eq!(issued.token, "bearer abc");
        assert_eq!(issued.expires_in, Some(Duration::from_secs(599)));
    }

    #[test]
    fn test_issued_token_without_expiry() {
        let body: TokenResponse = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        let issued = issued_token(body).unwrap();
        assert_eq!(issued.token, "bearer abc");
        assert_eq!(issued.expires_in, None);
    }

    #[test]
    fn test_empty_access_token_is_unavailable() {
        let body: TokenResponse = serde_json::from_str(r#"{"access_token":""}"#).unwrap();
        assert!(matches!(issued_token(body), Err(TokenError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_identity_endpoint_is_unavailable() {
        let config = UaaConfig {
            endpoint: "http://127.0.0.1:9".into(),
            password: "secret".into(),
            request_timeout_secs: 2,
            ..Default::default()
        };
        let client = UaaClient::from_config(&config).unwrap();
        assert!(matches!(client.fetch_token().await, Err(TokenError::Unavailable(_))));
    }
}
