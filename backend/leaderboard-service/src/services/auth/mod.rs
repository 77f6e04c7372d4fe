//! Bearer token supply for the upstream social-graph API
//!
//! The upstream hands out short-lived tokens in exchange for a client
//! credential document. Tokens are cached until they expire and refreshed
//! on demand.

use crate::config::AuthConfig;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A token is refreshed this long before its reported expiry
const EXPIRY_SKEW_SECS: i64 = 5;

#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    Request(String),

    #[error("Token request rejected with status {0}")]
    Rejected(u16),

    #[error("Token response could not be parsed: {0}")]
    InvalidResponse(String),

    #[error("Token request timed out after {0:?}")]
    Timeout(Duration),
}

/// Yields a currently valid bearer credential
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenSupplier: Send + Sync {
    async fn valid_token(&self) -> Result<String, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(EXPIRY_SKEW_SECS) < self.expires_at
    }
}

/// Client-credentials token supplier with an in-memory cache
///
/// Concurrent callers queue on the cache lock, so an expired token
/// triggers exactly one auth request.
pub struct ClientCredentialsTokenSupplier {
    http_client: reqwest::Client,
    auth_url: String,
    credentials: AuthConfig,
    timeout: Duration,
    token_cache: Mutex<Option<CachedToken>>,
}

impl ClientCredentialsTokenSupplier {
    pub fn new(
        http_client: reqwest::Client,
        auth_url: impl Into<String>,
        credentials: AuthConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            auth_url: auth_url.into(),
            credentials,
            timeout,
            token_cache: Mutex::new(None),
        }
    }

    async fn fetch_new_token(&self) -> Result<CachedToken, AuthError> {
        info!(auth_url = %self.auth_url, "Fetching new upstream token");

        let request = async {
            let response = self
                .http_client
                .post(&self.auth_url)
                .json(&self.credentials)
                .send()
                .await
                .map_err(|e| AuthError::Request(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(AuthError::Rejected(status.as_u16()));
            }

            response
                .json::<TokenResponse>()
                .await
                .map_err(|e| AuthError::InvalidResponse(e.to_string()))
        };

        let token = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| AuthError::Timeout(self.timeout))??;

        let expires_at = Utc::now() + ChronoDuration::seconds(token.expires_in.max(0));
        debug!(expires_at = %expires_at, "Upstream token acquired");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at,
        })
    }
}

#[async_trait]
impl TokenSupplier for ClientCredentialsTokenSupplier {
    async fn valid_token(&self) -> Result<String, AuthError> {
        let mut cache = self.token_cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.is_valid_at(Utc::now()) {
                return Ok(cached.access_token.clone());
            }
        }

        match self.fetch_new_token().await {
            Ok(fresh) => {
                let token = fresh.access_token.clone();
                *cache = Some(fresh);
                Ok(token)
            }
            Err(e) => {
                warn!(error = %e, "Failed to obtain upstream token");
                *cache = None;
                Err(e)
            }
        }
    }
}
