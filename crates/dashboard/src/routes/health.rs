//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
    pub backend: bool,
    pub sessions: usize,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let backend = state.store.client().health_check().await.unwrap_or(false);
    let sessions = state.sessions.active_count().await;

    Json(Health {
        status: if backend { "ok" } else { "degraded" }.to_string(),
        backend,
        sessions,
    })
}
