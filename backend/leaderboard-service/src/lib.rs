//! Leaderboard service
//!
//! Polls the upstream social graph, keeps two bounded rankings in memory
//! (users by post count, posts by comment count) and serves them over HTTP.

pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;

use std::sync::Arc;

use config::QueryConfig;
use services::refresh::{CacheSlot, RefreshOrchestrator};

pub use config::Config;
pub use error::{AppError, Result};

/// Shared state injected into handlers and background jobs
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<CacheSlot>,
    pub posts: Arc<CacheSlot>,
    pub orchestrator: Arc<RefreshOrchestrator>,
    pub limits: QueryConfig,
}
