//! Cached bearer credential shared by every receiver of one identity endpoint.
//!
//! Reads of a still-valid credential take only a read lock. Refreshes are
//! serialized: whoever waited on the refresh lock while another caller fetched
//! gets that fetch's outcome, token or error, instead of fetching again.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::app::ports::{IdentityClient, IssuedToken, TokenSource};
use crate::error::TokenError;
use crate::metrics::AuthMetrics;

#[derive(Debug, Clone)]
struct CachedCredential {
    token: String,
    /// `None` when the provider did not report a lifetime.
    expires_at: Option<Instant>,
}

impl CachedCredential {
    fn from_issued(issued: &IssuedToken, fetched_at: Instant) -> Self {
        Self {
            token: issued.token.clone(),
            expires_at: issued.expires_in.map(|ttl| fetched_at + ttl),
        }
    }

    fn usable(&self, skew: Duration) -> Option<&str> {
        let expires_at = self.expires_at?;
        if Instant::now() + skew < expires_at {
            Some(&self.token)
        } else {
            None
        }
    }
}

#[derive(Default)]
struct RefreshState {
    last_outcome: Option<Result<String, TokenError>>,
}

pub struct CachingTokenSource<C> {
    client: C,
    refresh_skew: Duration,
    cache: RwLock<Option<CachedCredential>>,
    /// Bumped after every completed fetch.
    generation: AtomicU64,
    refresh: Mutex<RefreshState>,
}

impl<C: IdentityClient> CachingTokenSource<C> {
    pub fn new(client: C, refresh_skew: Duration) -> Self {
        Self {
            client,
            refresh_skew,
            cache: RwLock::new(None),
            generation: AtomicU64::new(0),
            refresh: Mutex::new(RefreshState::default()),
        }
    }

    async fn cached(&self) -> Option<String> {
        let cache = self.cache.read().await;
        cache.as_ref().and_then(|c| c.usable(self.refresh_skew)).map(str::to_string)
    }

    /// `seen` is the fetch generation observed before the cache was found unusable.
    async fn refresh(&self, seen: u64) -> Result<String, TokenError> {
        let mut state = self.refresh.lock().await;

        if self.generation.load(Ordering::Acquire) != seen {
            if let Some(outcome) = &state.last_outcome {
                debug!("reusing token fetch completed while waiting");
                return outcome.clone();
            }
        }

        let started = Instant::now();
        let outcome = match self.client.fetch_token().await {
            Ok(issued) => {
                AuthMetrics::record_token_fetch(true, started.elapsed().as_secs_f64());
                debug!(expires_in = ?issued.expires_in, "fetched new authentication token");
                *self.cache.write().await = Some(CachedCredential::from_issued(&issued, started));
                Ok(issued.token)
            }
            Err(e) => {
                AuthMetrics::record_token_fetch(false, started.elapsed().as_secs_f64());
                warn!(error = %e, "token fetch failed");
                *self.cache.write().await = None;
                Err(e)
            }
        };

        state.last_outcome = Some(outcome.clone());
        self.generation.fetch_add(1, Ordering::Release);
        outcome
    }
}

#[async_trait]
impl<C: IdentityClient> TokenSource for CachingTokenSource<C> {
    async fn provide_token(&self) -> Result<String, TokenError> {
        let seen = self.generation.load(Ordering::Acquire);
        if let Some(token) = self.cached().await {
            return Ok(token);
        }
        self.refresh(seen).await
    }
}
