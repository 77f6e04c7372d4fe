//! Refresh orchestration across slots, snapshots and concurrent triggers
mod common;

use actix_web::{test, web, App};
use common::{app_state, sample_graph, FakeSocialGraph};
use leaderboard_service::handlers;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_concurrent_refreshes_share_one_upstream_pass() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(sample_graph());
    let state = app_state(dir.path(), source.clone());

    let (first, second) = tokio::join!(
        state.orchestrator.refresh(&state.users),
        state.orchestrator.refresh(&state.users)
    );

    assert_eq!(source.user_list_calls(), 1);
    assert_eq!(assert_ok!(first), assert_ok!(second));
    assert_eq!(state.users.len(), 7);
    assert_eq!(state.users.completed_refreshes(), 1);
}

#[tokio::test]
async fn test_slots_refresh_independently() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(sample_graph());
    let state = app_state(dir.path(), source.clone());

    state.orchestrator.refresh(&state.posts).await.unwrap();

    assert!(state.users.is_empty());
    assert_eq!(state.posts.len(), 28);
    assert_eq!(source.user_list_calls(), 1);
}

#[tokio::test]
async fn test_sequential_refreshes_each_hit_upstream() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(sample_graph());
    let state = app_state(dir.path(), source.clone());

    assert_ok!(state.orchestrator.refresh(&state.users).await);
    assert_ok!(state.orchestrator.refresh(&state.users).await);
    assert_eq!(source.user_list_calls(), 2);

    source.set_users_down(true);
    assert_err!(state.orchestrator.refresh(&state.users).await);
    assert_eq!(source.user_list_calls(), 3);
    assert_eq!(state.users.len(), 7);
}

#[actix_web::test]
async fn test_restart_serves_snapshot_without_upstream() {
    let dir = TempDir::new().unwrap();

    let first = app_state(dir.path(), Arc::new(sample_graph()));
    first.orchestrator.refresh(&first.users).await.unwrap();
    first.orchestrator.refresh(&first.posts).await.unwrap();
    let expected = first.users.top_by_score(5);

    // Second process over the same snapshot files, upstream unreachable
    let offline = Arc::new(FakeSocialGraph::new());
    offline.set_users_down(true);
    let second = app_state(dir.path(), offline.clone());
    assert_eq!(second.users.load_snapshot().map(|r| r.loaded), Some(7));
    assert_eq!(second.posts.load_snapshot().map(|r| r.loaded), Some(28));

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(second))
            .configure(handlers::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/users").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let served: Vec<&str> = body["topUsers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    let expected: Vec<&str> = expected.iter().map(|item| item.id.as_str()).collect();

    assert_eq!(served, expected);
    assert_eq!(offline.user_list_calls(), 0);
}

#[tokio::test]
async fn test_missing_snapshot_leaves_slot_empty() {
    let dir = TempDir::new().unwrap();
    let state = app_state(dir.path(), Arc::new(sample_graph()));

    assert!(state.users.load_snapshot().is_none());
    assert!(state.users.is_empty());
}
