//! Upstream social-graph data source
//!
//! Three reads feed both rankings: the user map, each user's posts, and
//! each post's comments.

mod client;

pub use client::HttpSocialGraphClient;

use crate::models::{UpstreamComment, UpstreamPost, UpstreamUser};
use crate::services::auth::AuthError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum UpstreamError {
    /// Transport failure or non-success status
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream call timed out after {0:?}")]
    Timeout(Duration),

    /// Response decoded but an expected field was missing or mistyped
    #[error("Malformed upstream response: {0}")]
    MalformedShape(String),

    /// No bearer token could be obtained
    #[error("Upstream authentication failed: {0}")]
    Auth(#[from] AuthError),
}

impl UpstreamError {
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Unavailable(_) => "unavailable",
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::MalformedShape(_) => "malformed",
            UpstreamError::Auth(_) => "auth",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialGraphSource: Send + Sync {
    /// All users, in upstream document order
    async fn fetch_users(&self) -> Result<Vec<UpstreamUser>, UpstreamError>;

    async fn fetch_user_posts(&self, user_id: &str) -> Result<Vec<UpstreamPost>, UpstreamError>;

    async fn fetch_post_comments(
        &self,
        post_id: &str,
    ) -> Result<Vec<UpstreamComment>, UpstreamError>;
}
