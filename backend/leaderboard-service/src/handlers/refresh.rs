/// Explicit rebuild triggers
///
/// Kept on GET so existing cron callers keep working.
use actix_web::{get, web, HttpResponse};
use tracing::error;

use crate::error::{AppError, Result};
use crate::models::MessageResponse;
use crate::AppState;

/// GET /create-user-heap
#[get("/create-user-heap")]
pub async fn create_user_heap(state: web::Data<AppState>) -> Result<HttpResponse> {
    state.orchestrator.refresh(&state.users).await.map_err(|e| {
        error!(error = %e, "User ranking rebuild failed");
        AppError::Internal("Failed to create user heap.".to_string())
    })?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("User heap created successfully.")))
}

/// GET /create-post-heap
#[get("/create-post-heap")]
pub async fn create_post_heap(state: web::Data<AppState>) -> Result<HttpResponse> {
    state.orchestrator.refresh(&state.posts).await.map_err(|e| {
        error!(error = %e, "Post ranking rebuild failed");
        AppError::Internal("Failed to create post heap.".to_string())
    })?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Post heap created successfully.")))
}
