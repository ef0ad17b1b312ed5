use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chatrelay_agent::AgentRuntime;
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub bot_handle: String,
    pub tracked_conversations: usize,
    pub tracked_users: usize,
    pub checked_at: String,
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let runtime = &state.runtime;
    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "chatrelay-server runtime initialized".to_string(),
        },
        bot_handle: runtime.router().mention_handle().to_string(),
        tracked_conversations: runtime.store().conversation_count(),
        tracked_users: runtime.limiter().tracked_users(),
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
