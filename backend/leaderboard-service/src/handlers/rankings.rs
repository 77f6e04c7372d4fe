/// Ranking query handlers
///
/// Reads are served from the in-memory slots. An empty slot is refreshed
/// once before answering; if that refresh fails the handler still answers
/// from whatever the slot holds.
use actix_web::{get, web, HttpResponse};
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::{LatestPostsResponse, PopularPostsResponse, PostsQuery, TopUsersResponse};
use crate::services::refresh::{CacheSlot, RefreshError};
use crate::AppState;

/// Post ranking views selectable through `?type=`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostView {
    Popular,
    Latest,
}

impl PostView {
    fn parse(kind: Option<&str>) -> Option<Self> {
        match kind {
            Some("popular") => Some(PostView::Popular),
            Some("latest") => Some(PostView::Latest),
            _ => None,
        }
    }
}

/// Populate `slot` if it is empty.
///
/// Upstream failures are swallowed; only a broken refresh task surfaces.
async fn populate(state: &AppState, slot: &CacheSlot) -> std::result::Result<(), RefreshError> {
    match state.orchestrator.ensure_populated(slot).await {
        Some(Err(RefreshError::Upstream(e))) => {
            warn!(slot = %slot.kind(), error = %e, "On-demand refresh failed, serving cached ranking");
            Ok(())
        }
        Some(Err(e)) => Err(e),
        Some(Ok(_)) | None => Ok(()),
    }
}

/// GET /users
///
/// Top users by post count.
#[get("/users")]
pub async fn get_top_users(state: web::Data<AppState>) -> Result<HttpResponse> {
    populate(&state, &state.users).await.map_err(|e| {
        warn!(error = %e, "Failed to populate user ranking");
        AppError::Internal("Error fetching top users".to_string())
    })?;

    let top_users = state.users.top_by_score(state.limits.top_users_limit);
    debug!(count = top_users.len(), "Serving top users");

    Ok(HttpResponse::Ok().json(TopUsersResponse { top_users }))
}

/// GET /posts?type=popular|latest
#[get("/posts")]
pub async fn get_posts(
    state: web::Data<AppState>,
    query: web::Query<PostsQuery>,
) -> Result<HttpResponse> {
    let view = PostView::parse(query.kind.as_deref())
        .ok_or_else(|| AppError::BadRequest("Invalid request".to_string()))?;

    populate(&state, &state.posts).await.map_err(|e| {
        warn!(error = %e, "Failed to populate post ranking");
        AppError::Internal("Error fetching posts".to_string())
    })?;

    let response = match view {
        PostView::Popular => HttpResponse::Ok().json(PopularPostsResponse {
            most_popular_posts: state.posts.max_score_group(),
        }),
        PostView::Latest => HttpResponse::Ok().json(LatestPostsResponse {
            latest_posts: state.posts.top_by_recency(state.limits.latest_posts_limit),
        }),
    };

    Ok(response)
}
