//! In-memory upstream and state builders shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use leaderboard_service::config::QueryConfig;
use leaderboard_service::models::{UpstreamComment, UpstreamPost, UpstreamUser};
use leaderboard_service::services::{
    CacheSlot, RefreshOrchestrator, SlotKind, SocialGraphSource, UpstreamError,
};
use leaderboard_service::AppState;
use ranked_set::SnapshotStore;
use serde_json::{json, Map};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Fixed social graph. Users registered without posts answer the posts
/// call with a malformed body, posts without comment counts likewise.
#[derive(Default)]
pub struct FakeSocialGraph {
    users: Vec<UpstreamUser>,
    posts: HashMap<String, Vec<UpstreamPost>>,
    comments: HashMap<String, usize>,
    users_down: AtomicBool,
    user_list_calls: AtomicUsize,
}

impl FakeSocialGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user owning posts with the given ids
    pub fn with_user(mut self, id: &str, name: &str, post_ids: &[&str]) -> Self {
        self.users.push(UpstreamUser {
            id: id.to_string(),
            name: name.to_string(),
        });
        let posts = post_ids
            .iter()
            .map(|post_id| {
                let mut fields = Map::new();
                fields.insert("userid".to_string(), json!(id));
                fields.insert("content".to_string(), json!(format!("post {}", post_id)));
                UpstreamPost {
                    id: Some(post_id.to_string()),
                    fields,
                }
            })
            .collect();
        self.posts.insert(id.to_string(), posts);
        self
    }

    /// Add a user whose posts call fails
    pub fn with_broken_user(mut self, id: &str, name: &str) -> Self {
        self.users.push(UpstreamUser {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_comments(mut self, post_id: &str, count: usize) -> Self {
        self.comments.insert(post_id.to_string(), count);
        self
    }

    pub fn set_users_down(&self, down: bool) {
        self.users_down.store(down, Ordering::SeqCst);
    }

    pub fn user_list_calls(&self) -> usize {
        self.user_list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocialGraphSource for FakeSocialGraph {
    async fn fetch_users(&self) -> Result<Vec<UpstreamUser>, UpstreamError> {
        self.user_list_calls.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to queue up
        tokio::task::yield_now().await;

        if self.users_down.load(Ordering::SeqCst) {
            return Err(UpstreamError::Unavailable("connection refused".to_string()));
        }
        Ok(self.users.clone())
    }

    async fn fetch_user_posts(&self, user_id: &str) -> Result<Vec<UpstreamPost>, UpstreamError> {
        self.posts.get(user_id).cloned().ok_or_else(|| {
            UpstreamError::MalformedShape("expected a \"posts\" array".to_string())
        })
    }

    async fn fetch_post_comments(
        &self,
        post_id: &str,
    ) -> Result<Vec<UpstreamComment>, UpstreamError> {
        let count = self.comments.get(post_id).copied().ok_or_else(|| {
            UpstreamError::MalformedShape("expected a \"comments\" array".to_string())
        })?;
        Ok((0..count).map(|i| json!({ "id": i })).collect())
    }
}

pub fn app_state(dir: &Path, source: Arc<FakeSocialGraph>) -> AppState {
    AppState {
        users: Arc::new(CacheSlot::new(
            SlotKind::UserRanking,
            SnapshotStore::new(dir.join("heap.json")),
        )),
        posts: Arc::new(CacheSlot::new(
            SlotKind::PostRanking,
            SnapshotStore::new(dir.join("popular_posts.json")),
        )),
        orchestrator: Arc::new(RefreshOrchestrator::new(source)),
        limits: QueryConfig::default(),
    }
}

/// Seven users with 1..=7 posts; post `pN-0` of each user has N comments.
pub fn sample_graph() -> FakeSocialGraph {
    let mut graph = FakeSocialGraph::new();
    for n in 1..=7usize {
        let post_ids: Vec<String> = (0..n).map(|i| format!("p{}-{}", n, i)).collect();
        let post_refs: Vec<&str> = post_ids.iter().map(String::as_str).collect();
        graph = graph.with_user(&n.to_string(), &format!("user {}", n), &post_refs);
        for (i, post_id) in post_ids.iter().enumerate() {
            let comments = if i == 0 { n } else { 0 };
            graph = graph.with_comments(post_id, comments);
        }
    }
    graph
}
