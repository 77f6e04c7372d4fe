use actix_web::{dev::Service, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leaderboard_service::config::Config;
use leaderboard_service::handlers;
use leaderboard_service::jobs::{start_refresh_scheduler, RefreshSchedulerConfig};
use leaderboard_service::services::{
    CacheSlot, ClientCredentialsTokenSupplier, HttpSocialGraphClient, RefreshOrchestrator,
    SlotKind,
};
use leaderboard_service::AppState;
use ranked_set::SnapshotStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},actix_web=info", config.app.log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    tracing::info!("Starting leaderboard-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let http_client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;

    let tokens = Arc::new(ClientCredentialsTokenSupplier::new(
        http_client.clone(),
        config.upstream.auth_url.clone(),
        config.auth.clone(),
        config.upstream.timeout(),
    ));
    let source = Arc::new(HttpSocialGraphClient::new(
        http_client,
        &config.upstream.base_url,
        tokens,
        config.upstream.timeout(),
    ));
    tracing::info!(base_url = %config.upstream.base_url, "Upstream client initialized");

    // Rankings survive restarts through their snapshot files
    let users = Arc::new(CacheSlot::new(
        SlotKind::UserRanking,
        SnapshotStore::new(&config.snapshots.user_ranking_path),
    ));
    let posts = Arc::new(CacheSlot::new(
        SlotKind::PostRanking,
        SnapshotStore::new(&config.snapshots.post_ranking_path),
    ));
    users.load_snapshot();
    posts.load_snapshot();

    let state = AppState {
        users,
        posts,
        orchestrator: Arc::new(RefreshOrchestrator::new(source)),
        limits: config.query,
    };

    // Background refresh jobs
    if config.scheduler.enabled {
        tokio::spawn(start_refresh_scheduler(
            Arc::clone(&state.orchestrator),
            Arc::clone(&state.users),
            RefreshSchedulerConfig::user_ranking(&config.scheduler),
        ));
        tokio::spawn(start_refresh_scheduler(
            Arc::clone(&state.orchestrator),
            Arc::clone(&state.posts),
            RefreshSchedulerConfig::post_ranking(&config.scheduler),
        ));
        tracing::info!("Refresh schedulers started");
    } else {
        tracing::info!("Refresh schedulers disabled by configuration");
    }

    let bind_addr = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server on {}", bind_addr);

    let app_state = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let path = req
                    .match_pattern()
                    .unwrap_or_else(|| req.path().to_string());
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    let res = fut.await;
                    let status = match &res {
                        Ok(res) => res.status().as_u16(),
                        Err(_) => 500,
                    };
                    leaderboard_service::metrics::observe_http_request(
                        &method,
                        &path,
                        status,
                        start.elapsed(),
                    );
                    res
                }
            })
            .wrap(TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("failed to bind {}", bind_addr))?
    .run()
    .await
    .context("HTTP server error")?;

    Ok(())
}
