//! REST API endpoint handlers.
//!
//! Every response body is an envelope `{success, reason, data}`. Refusals
//! that are ordinary engine outcomes (interval guard, busy, stopped) are
//! answered with `success: false` and a reason; only unknown agents, bad
//! requests and collaborator failures produce error statuses.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/status` | Engine-wide status and counters |
//! | `GET` | `/api/agents` | Agent summaries |
//! | `GET` | `/api/agents/{id}` | One agent's persona, behavior and relationships |
//! | `GET` | `/api/agents/{id}/state` | One agent's full serialized state |
//! | `POST` | `/api/agents/{id}/posts` | Create a post now |
//! | `POST` | `/api/agents/{id}/stop` | Stop an agent |
//! | `POST` | `/api/agents/{id}/start` | Start an agent and schedule its next post |
//! | `POST` | `/api/events` | Dispatch an event |
//! | `POST` | `/api/engine/pause` | Pause the driver loop |
//! | `POST` | `/api/engine/resume` | Resume the driver loop |

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use puppet_core::{PostOutcome, PostRequest, RunControl};
use puppet_types::{AgentId, Event, EventKind};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation did what was asked.
    pub success: bool,
    /// Why it did not, when `success` is false.
    pub reason: Option<String>,
    /// Result payload.
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// A successful response.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            reason: None,
            data: Some(data),
        }
    }

    /// A refusal that still carries data.
    pub fn refused(reason: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
            data: Some(data),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ObserverError>;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/events`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRequest {
    /// Event kind.
    pub kind: EventKind,
    /// Recipients; empty means every agent.
    #[serde(default)]
    pub target_agent_ids: Vec<AgentId>,
    /// Kind-specific payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Response data for stop and start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentControlResult {
    /// The agent acted on.
    pub agent_id: AgentId,
    /// Whether the agent is now active.
    pub active: bool,
    /// Next scheduled post, if any.
    pub next_post_at: Option<chrono::DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Read endpoints
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Engine-wide status.
pub async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<serde_json::Value> {
    let status = state.engine.get_status().await;
    let mut data = serde_json::to_value(status)?;
    if let Some(control) = &state.control {
        data["paused"] = serde_json::Value::Bool(control.is_paused());
    }
    Ok(Json(ApiResponse::ok(data)))
}

/// Summaries of every agent.
pub async fn list_agents(State(state): State<Arc<AppState>>) -> ApiResult<serde_json::Value> {
    let agents = state.engine.get_status().await.agents;
    Ok(Json(ApiResponse::ok(serde_json::json!({
        "count": agents.len(),
        "agents": agents,
    }))))
}

/// Detailed view of one agent.
pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<puppet_core::AgentView> {
    let view = state.engine.get_agent(&AgentId::new(id)).await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// Full serialized state of one agent.
pub async fn get_agent_state(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let agent_state = state.engine.agent_state(&AgentId::new(id)).await?;
    Ok(Json(ApiResponse::ok(serde_json::to_value(agent_state)?)))
}

// ---------------------------------------------------------------------------
// Agent commands
// ---------------------------------------------------------------------------

/// Create a post now. The body is an optional [`PostRequest`].
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<PostOutcome> {
    let request: PostRequest = if body.iter().all(u8::is_ascii_whitespace) {
        PostRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ObserverError::InvalidRequest(format!("invalid post request: {e}")))?
    };
    let agent_id = AgentId::new(id);
    let outcome = state.engine.create_post(&agent_id, &request).await?;
    info!(agent_id = %agent_id, posted = outcome.is_posted(), "Manual post requested");

    let response = match &outcome {
        PostOutcome::Posted(_) => ApiResponse::ok(outcome),
        PostOutcome::Rejected(rejection) => ApiResponse::refused(
            format!(
                "minimum interval of {} hours not elapsed; next post allowed at {}",
                rejection.min_hours_between_posts, rejection.next_allowed_at
            ),
            outcome,
        ),
        PostOutcome::Busy => ApiResponse::refused("agent is busy", outcome),
        PostOutcome::Stopped => ApiResponse::refused("agent is stopped", outcome),
        PostOutcome::Discarded => {
            ApiResponse::refused("agent was stopped during generation", outcome)
        }
    };
    Ok(Json(response))
}

/// Stop an agent and cancel its pending post.
pub async fn stop_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<AgentControlResult> {
    let agent_id = AgentId::new(id);
    state.engine.stop_agent(&agent_id).await?;
    Ok(Json(ApiResponse::ok(AgentControlResult {
        agent_id,
        active: false,
        next_post_at: None,
    })))
}

/// Start an agent and schedule its next post.
pub async fn start_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<AgentControlResult> {
    let agent_id = AgentId::new(id);
    let next_post_at = state.engine.start_agent(&agent_id, Utc::now()).await?;
    Ok(Json(ApiResponse::ok(AgentControlResult {
        agent_id,
        active: true,
        next_post_at,
    })))
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Dispatch an event to its targets (or every agent).
pub async fn dispatch_event(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EventRequest>,
) -> ApiResult<puppet_core::DispatchReport> {
    let mut event = Event::new(request.kind, request.data);
    if event.kind == EventKind::InteractionPrompt {
        let prompt = event.as_interaction_prompt().ok_or_else(|| {
            ObserverError::InvalidRequest(
                "interaction_prompt requires initiator_id and target_id".to_owned(),
            )
        })?;
        event = Event::interaction_prompt(&prompt);
    }
    if !request.target_agent_ids.is_empty() {
        event = event.with_targets(request.target_agent_ids);
    }
    info!(event_id = %event.id, kind = ?event.kind, "Event submitted");
    let report = state.engine.trigger_event(&event).await;
    if report.failures.is_empty() {
        Ok(Json(ApiResponse::ok(report)))
    } else {
        let reason = format!("{} recipient(s) failed", report.failures.len());
        Ok(Json(ApiResponse::refused(reason, report)))
    }
}

// ---------------------------------------------------------------------------
// Driver loop control
// ---------------------------------------------------------------------------

/// Pause the driver loop.
pub async fn pause(State(state): State<Arc<AppState>>) -> ApiResult<serde_json::Value> {
    let control = control(&state)?;
    control.pause();
    info!("Engine loop paused");
    Ok(Json(ApiResponse::ok(serde_json::json!({"paused": true}))))
}

/// Resume the driver loop.
pub async fn resume(State(state): State<Arc<AppState>>) -> ApiResult<serde_json::Value> {
    let control = control(&state)?;
    control.resume();
    info!("Engine loop resumed");
    Ok(Json(ApiResponse::ok(serde_json::json!({"paused": false}))))
}

fn control(state: &AppState) -> Result<&Arc<RunControl>, ObserverError> {
    state
        .control
        .as_ref()
        .ok_or_else(|| ObserverError::Internal("run control not available".to_owned()))
}
