pub mod rankings;
pub mod refresh;

use actix_web::{web, HttpResponse};

use crate::error::AppError;

pub use rankings::{get_posts, get_top_users};
pub use refresh::{create_post_heap, create_user_heap};

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

/// Undecodable query strings (e.g. a repeated `type`) get the same JSON
/// 400 as an unknown value.
fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, req| {
        tracing::debug!(path = %req.path(), error = %err, "Rejected query string");
        AppError::BadRequest("Invalid request".to_string()).into()
    })
}

/// Register every route of the service
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(query_config())
        .service(get_top_users)
        .service(get_posts)
        .service(create_user_heap)
        .service(create_post_heap)
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(crate::metrics::serve_metrics));
}
