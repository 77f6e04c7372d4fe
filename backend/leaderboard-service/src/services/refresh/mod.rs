//! Ranking refresh orchestration
//!
//! A refresh pulls the whole upstream dataset (users → posts → comments),
//! builds a fresh ranked set next to the live one, persists it, and swaps
//! it into the slot. Readers never see a half-built ranking, and a failed
//! user-list fetch leaves the previous ranking in place.
//!
//! At most one refresh per slot runs at a time. A trigger that arrives
//! while a refresh is in flight waits for it and shares its outcome.

use crate::metrics;
use crate::models::UpstreamUser;
use crate::services::upstream::{SocialGraphSource, UpstreamError};
use parking_lot::{Mutex, RwLock};
use ranked_set::{Clock, RankedSet, RestoreReport, ScoredItem, SnapshotStore, SystemClock};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// Users scored by post count
    UserRanking,
    /// Posts scored by comment count
    PostRanking,
}

impl SlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::UserRanking => "user_ranking",
            SlotKind::PostRanking => "post_ranking",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a completed refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub slot: SlotKind,
    /// Users returned by the upstream user list
    pub users: usize,
    /// Items in the new ranking
    pub inserted: usize,
    /// Users or posts dropped because of upstream errors
    pub skipped: usize,
    /// Whether the snapshot write succeeded
    pub persisted: bool,
    pub duration_ms: u64,
}

#[derive(Error, Debug, Clone)]
pub enum RefreshError {
    #[error("User list unavailable: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Refresh task failed: {0}")]
    Internal(String),
}

type RefreshOutcome = Result<RefreshReport, RefreshError>;

/// One named ranking cache and its snapshot file
pub struct CacheSlot {
    kind: SlotKind,
    set: RwLock<RankedSet>,
    store: SnapshotStore,
    clock: Arc<dyn Clock>,
    refresh_lock: tokio::sync::Mutex<()>,
    completed_refreshes: AtomicU64,
    last_outcome: Mutex<Option<RefreshOutcome>>,
}

impl CacheSlot {
    pub fn new(kind: SlotKind, store: SnapshotStore) -> Self {
        Self::with_clock(kind, store, Arc::new(SystemClock))
    }

    pub fn with_clock(kind: SlotKind, store: SnapshotStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            kind,
            set: RwLock::new(RankedSet::with_clock(Arc::clone(&clock))),
            store,
            clock,
            refresh_lock: tokio::sync::Mutex::new(()),
            completed_refreshes: AtomicU64::new(0),
            last_outcome: Mutex::new(None),
        }
    }

    /// Hydrate the slot from its snapshot file.
    ///
    /// A missing or unreadable snapshot leaves the slot empty; the error is
    /// logged, never propagated.
    pub fn load_snapshot(&self) -> Option<RestoreReport> {
        let mut restored = self.new_set();
        match self.store.load_into(&mut restored) {
            Ok(Some(report)) => {
                info!(
                    slot = %self.kind,
                    path = %self.store.path().display(),
                    loaded = report.loaded,
                    duplicates_dropped = report.duplicates_dropped,
                    reheapified = report.reheapified,
                    "Ranking restored from snapshot"
                );
                self.replace(restored);
                Some(report)
            }
            Ok(None) => {
                info!(slot = %self.kind, "No snapshot found, starting empty");
                None
            }
            Err(e) => {
                error!(
                    slot = %self.kind,
                    path = %self.store.path().display(),
                    error = %e,
                    "Failed to load snapshot, starting empty"
                );
                None
            }
        }
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.set.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.read().is_empty()
    }

    pub fn top_by_score(&self, n: usize) -> Vec<ScoredItem> {
        self.set.read().top_by_score(n)
    }

    pub fn top_by_recency(&self, n: usize) -> Vec<ScoredItem> {
        self.set.read().top_by_recency(n)
    }

    pub fn max_score_group(&self) -> Vec<ScoredItem> {
        self.set.read().max_score_group()
    }

    /// Number of refreshes this slot has finished, successful or not
    pub fn completed_refreshes(&self) -> u64 {
        self.completed_refreshes.load(Ordering::Acquire)
    }

    fn new_set(&self) -> RankedSet {
        RankedSet::with_clock(Arc::clone(&self.clock))
    }

    fn replace(&self, set: RankedSet) {
        let size = set.len();
        *self.set.write() = set;
        metrics::set_slot_size(self.kind.as_str(), size);
    }
}

/// Rebuilds cache slots from the upstream social graph
pub struct RefreshOrchestrator {
    source: Arc<dyn SocialGraphSource>,
}

impl RefreshOrchestrator {
    pub fn new(source: Arc<dyn SocialGraphSource>) -> Self {
        Self { source }
    }

    /// Rebuild `slot` from upstream, or join a refresh already in flight.
    pub async fn refresh(&self, slot: &CacheSlot) -> RefreshOutcome {
        let observed = slot.completed_refreshes();
        let _guard = slot.refresh_lock.lock().await;

        if slot.completed_refreshes() != observed {
            let joined = slot.last_outcome.lock().clone();
            if let Some(outcome) = joined {
                debug!(slot = %slot.kind, "Joined in-flight refresh");
                metrics::record_refresh(slot.kind.as_str(), "joined");
                return outcome;
            }
        }

        let started = Instant::now();
        let outcome = self.rebuild(slot).await;
        metrics::record_refresh_duration(slot.kind.as_str(), started.elapsed());

        match &outcome {
            Ok(report) => {
                info!(
                    slot = %slot.kind,
                    users = report.users,
                    inserted = report.inserted,
                    skipped = report.skipped,
                    persisted = report.persisted,
                    duration_ms = report.duration_ms,
                    "Ranking refreshed"
                );
                metrics::record_refresh(slot.kind.as_str(), "success");
            }
            Err(e) => {
                error!(slot = %slot.kind, error = %e, "Ranking refresh aborted");
                metrics::record_refresh(slot.kind.as_str(), "error");
            }
        }

        *slot.last_outcome.lock() = Some(outcome.clone());
        slot.completed_refreshes.fetch_add(1, Ordering::Release);
        outcome
    }

    /// Refresh `slot` only if it holds nothing yet.
    ///
    /// Returns `None` when the slot was already populated.
    pub async fn ensure_populated(&self, slot: &CacheSlot) -> Option<RefreshOutcome> {
        if !slot.is_empty() {
            return None;
        }
        debug!(slot = %slot.kind, "Slot empty, refreshing before answering");
        Some(self.refresh(slot).await)
    }

    async fn rebuild(&self, slot: &CacheSlot) -> RefreshOutcome {
        let started = Instant::now();
        let users = self.source.fetch_users().await?;
        debug!(slot = %slot.kind, users = users.len(), "Fetched user list");

        let mut set = slot.new_set();
        let skipped = match slot.kind {
            SlotKind::UserRanking => self.rank_users(&users, &mut set).await,
            SlotKind::PostRanking => self.rank_posts(&users, &mut set).await,
        };
        if skipped > 0 {
            metrics::record_skipped(slot.kind.as_str(), skipped);
        }

        let inserted = set.len();
        let (set, persisted) = persist(slot, set).await?;
        slot.replace(set);

        Ok(RefreshReport {
            slot: slot.kind,
            users: users.len(),
            inserted,
            skipped,
            persisted,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// One item per user, scored by post count.
    async fn rank_users(&self, users: &[UpstreamUser], set: &mut RankedSet) -> usize {
        let mut skipped = 0;
        for user in users {
            match self.source.fetch_user_posts(&user.id).await {
                Ok(posts) => {
                    set.insert(
                        ScoredItem::new(user.id.clone(), posts.len() as u64)
                            .with_field("name", user.name.clone()),
                    );
                }
                Err(e) => {
                    warn!(user_id = %user.id, kind = e.kind(), error = %e, "Skipping user");
                    skipped += 1;
                }
            }
        }
        skipped
    }

    /// One item per post, scored by comment count.
    async fn rank_posts(&self, users: &[UpstreamUser], set: &mut RankedSet) -> usize {
        let mut skipped = 0;
        for user in users {
            let posts = match self.source.fetch_user_posts(&user.id).await {
                Ok(posts) => posts,
                Err(e) => {
                    warn!(user_id = %user.id, kind = e.kind(), error = %e, "Skipping posts of user");
                    skipped += 1;
                    continue;
                }
            };

            for post in posts {
                let Some(post_id) = post.id else {
                    warn!(user_id = %user.id, "Skipping post without id");
                    skipped += 1;
                    continue;
                };

                match self.source.fetch_post_comments(&post_id).await {
                    Ok(comments) => {
                        set.insert(ScoredItem {
                            id: post_id,
                            score: comments.len() as u64,
                            arrival_time: 0,
                            payload: post.fields,
                        });
                    }
                    Err(e) => {
                        warn!(post_id = %post_id, kind = e.kind(), error = %e, "Skipping post");
                        skipped += 1;
                    }
                }
            }
        }
        skipped
    }
}

/// Write the snapshot off the async executor. A failed write is logged and
/// reported through the returned flag; the new ranking is used either way.
async fn persist(slot: &CacheSlot, set: RankedSet) -> Result<(RankedSet, bool), RefreshError> {
    let store = slot.store.clone();
    let (set, result) = tokio::task::spawn_blocking(move || {
        let result = store.save(&set);
        (set, result)
    })
    .await
    .map_err(|e| RefreshError::Internal(format!("snapshot task failed: {}", e)))?;

    match result {
        Ok(()) => Ok((set, true)),
        Err(e) => {
            error!(
                slot = %slot.kind,
                path = %slot.store.path().display(),
                error = %e,
                "Failed to persist snapshot"
            );
            metrics::record_snapshot_write_failure(slot.kind.as_str());
            Ok((set, false))
        }
    }
}
