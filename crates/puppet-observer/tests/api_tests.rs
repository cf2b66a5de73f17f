//! Integration tests for the observer API endpoints.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, against an engine wired to the in-memory
//! collaborators.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use puppet_agents::{Agent, MemoryLimits};
use puppet_core::scheduler::SchedulerConfig;
use puppet_core::{
    AgentRegistry, ContentGenerator, Engine, InMemoryPlatform, Platform, RunControl,
    StubContentGenerator,
};
use puppet_observer::{AppState, build_router};
use puppet_types::AgentId;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct Fixture {
    router: Router,
    platform: Arc<InMemoryPlatform>,
    control: Arc<RunControl>,
}

fn fixture() -> Fixture {
    let agents = ["claudia", "bob"]
        .into_iter()
        .map(|id| Agent::new(AgentId::new(id), id.to_uppercase(), MemoryLimits::default()));
    let platform = Arc::new(InMemoryPlatform::new());
    let engine = Engine::new(
        Arc::new(AgentRegistry::from_agents(agents)),
        Arc::new(StubContentGenerator::new()) as Arc<dyn ContentGenerator>,
        Arc::clone(&platform) as Arc<dyn Platform>,
        SchedulerConfig::default(),
        Some(42),
    );
    let control = Arc::new(RunControl::new());
    let state = AppState::with_control(Arc::new(engine), Arc::clone(&control));
    Fixture {
        router: build_router(Arc::new(state)),
        platform,
        control,
    }
}

fn router_without_control() -> Router {
    let engine = Engine::new(
        Arc::new(AgentRegistry::new()),
        Arc::new(StubContentGenerator::new()) as Arc<dyn ContentGenerator>,
        Arc::new(InMemoryPlatform::new()) as Arc<dyn Platform>,
        SchedulerConfig::default(),
        Some(42),
    );
    build_router(Arc::new(AppState::new(Arc::new(engine))))
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post(router: &Router, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::post(uri).body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_ok() {
    let fixture = fixture();
    let (status, json) = get(&fixture.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn status_reports_agents_and_pause_flag() {
    let fixture = fixture();
    let (status, json) = get(&fixture.router, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["agent_count"], 2);
    assert_eq!(json["data"]["active_agents"], 2);
    assert_eq!(json["data"]["paused"], false);
}

#[tokio::test]
async fn list_agents_is_ordered_by_id() {
    let fixture = fixture();
    let (status, json) = get(&fixture.router, "/api/agents").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["count"], 2);
    assert_eq!(json["data"]["agents"][0]["id"], "bob");
    assert_eq!(json["data"]["agents"][1]["name"], "CLAUDIA");
}

#[tokio::test]
async fn agent_detail_and_state() {
    let fixture = fixture();
    let (status, json) = get(&fixture.router, "/api/agents/claudia").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], "claudia");
    assert!(json["data"]["behavior"].is_object());

    let (status, json) = get(&fixture.router, "/api/agents/claudia/state").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"]["mood"].is_object());
}

#[tokio::test]
async fn unknown_agent_is_not_found() {
    let fixture = fixture();
    let (status, json) = get(&fixture.router, "/api/agents/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert!(json["reason"].as_str().unwrap().contains("ghost"));
}

// ---------------------------------------------------------------------------
// Posting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn manual_post_then_interval_refusal() {
    let fixture = fixture();
    let (status, json) = post(&fixture.router, "/api/agents/claudia/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["outcome"], "posted");
    assert_eq!(fixture.platform.published().await.len(), 1);

    let (status, json) = post(&fixture.router, "/api/agents/claudia/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert_eq!(json["data"]["outcome"], "rejected");
    assert!(json["reason"].as_str().unwrap().contains("minimum interval"));
}

#[tokio::test]
async fn exempt_post_with_instruction() {
    let fixture = fixture();
    let body = json!({"instruction": "Say hi", "exempt_from_interval": true});
    let (_, first) = post(&fixture.router, "/api/agents/bob/posts", Some(body.clone())).await;
    let (_, second) = post(&fixture.router, "/api/agents/bob/posts", Some(body)).await;
    assert_eq!(first["success"], true);
    assert_eq!(second["success"], true);
    assert_eq!(fixture.platform.published().await.len(), 2);
}

#[tokio::test]
async fn malformed_post_body_is_bad_request() {
    let fixture = fixture();
    let (status, json) = post(
        &fixture.router,
        "/api/agents/claudia/posts",
        Some(json!({"instruction": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn stop_and_start_agent() {
    let fixture = fixture();
    let (status, json) = post(&fixture.router, "/api/agents/claudia/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["active"], false);

    let (_, json) = post(&fixture.router, "/api/agents/claudia/posts", None).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["reason"], "agent is stopped");

    let (status, json) = post(&fixture.router, "/api/agents/claudia/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["active"], true);
    assert!(json["data"]["next_post_at"].is_string());
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_news_reaches_every_agent() {
    let fixture = fixture();
    let body = json!({"kind": "news", "data": {"headline": "Comet spotted"}});
    let (status, json) = post(&fixture.router, "/api/events", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["delivered"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_event_target_is_reported() {
    let fixture = fixture();
    let body = json!({
        "kind": "mood_shift",
        "target_agent_ids": ["claudia", "ghost"],
        "data": {"description": "gloomy weather"}
    });
    let (status, json) = post(&fixture.router, "/api/events", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert_eq!(json["data"]["failures"][0]["agent_id"], "ghost");
    assert_eq!(json["data"]["delivered"][0], "claudia");
}

#[tokio::test]
async fn interaction_prompt_needs_participants() {
    let fixture = fixture();
    let body = json!({"kind": "interaction_prompt", "data": {"content": "say hi"}});
    let (status, json) = post(&fixture.router, "/api/events", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn interaction_prompt_targets_both_participants() {
    let fixture = fixture();
    let body = json!({
        "kind": "interaction_prompt",
        "data": {"initiator_id": "claudia", "target_id": "bob", "content": "hey bob"}
    });
    let (status, json) = post(&fixture.router, "/api/events", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["delivered"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Driver loop control
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pause_and_resume() {
    let fixture = fixture();
    let (status, _) = post(&fixture.router, "/api/engine/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(fixture.control.is_paused());

    let (_, json) = get(&fixture.router, "/api/status").await;
    assert_eq!(json["data"]["paused"], true);

    post(&fixture.router, "/api/engine/resume", None).await;
    assert!(!fixture.control.is_paused());
}

#[tokio::test]
async fn pause_without_control_is_an_error() {
    let router = router_without_control();
    let (status, json) = post(&router, "/api/engine/pause", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
}
