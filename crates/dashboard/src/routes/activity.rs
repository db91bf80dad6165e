//! Live activity and extension status.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use futures::StreamExt;
use policy::LivenessStatus;
use serde::Serialize;
use tokio_stream::wrappers::WatchStream;
use tracing::warn;

use crate::error::{DashboardError, Result};
use crate::reconciler::DashboardSnapshot;
use crate::session::SessionContext;
use crate::state::AppState;

/// Extension status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub user_id: String,
    #[serde(flatten)]
    pub liveness: LivenessStatus,
    pub headline: &'static str,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Current activity snapshot as JSON.
pub async fn activity_api(
    State(state): State<AppState>,
    context: SessionContext,
) -> Result<Json<DashboardSnapshot>> {
    Ok(Json(current_snapshot(&state, &context).await?))
}

/// Extension liveness as JSON.
pub async fn status_api(
    State(state): State<AppState>,
    context: SessionContext,
) -> Result<Json<StatusResponse>> {
    let snapshot = current_snapshot(&state, &context).await?;

    Ok(Json(StatusResponse {
        user_id: context.user_id().to_string(),
        headline: snapshot.liveness.headline(),
        liveness: snapshot.liveness,
        last_seen: snapshot.last_seen,
    }))
}

/// Stream snapshots as they change. The stream ends with the session;
/// token refreshes keep it open.
pub async fn activity_stream(
    State(state): State<AppState>,
    context: SessionContext,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let snapshots = state
        .sessions
        .snapshots(&context.key)
        .await
        .ok_or(DashboardError::Unauthenticated)?;

    let stream = WatchStream::new(snapshots)
        .map(|snapshot| Ok::<_, Infallible>(snapshot_event(&snapshot)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn current_snapshot(
    state: &AppState,
    context: &SessionContext,
) -> Result<DashboardSnapshot> {
    let snapshots = state
        .sessions
        .snapshots(&context.key)
        .await
        .ok_or(DashboardError::Unauthenticated)?;
    let snapshot = snapshots.borrow().clone();
    Ok(snapshot)
}

fn snapshot_event(snapshot: &DashboardSnapshot) -> Event {
    Event::default()
        .event("snapshot")
        .json_data(snapshot)
        .unwrap_or_else(|err| {
            warn!("Failed to encode snapshot: {}", err);
            Event::default().comment("snapshot unavailable")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_flattens_liveness() {
        let response = StatusResponse {
            user_id: "user-1".to_string(),
            liveness: LivenessStatus::Inactive {
                label: "2 days ago".to_string(),
            },
            headline: "Inactive",
            last_seen: None,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "inactive");
        assert_eq!(value["label"], "2 days ago");
        assert_eq!(value["headline"], "Inactive");
    }
}
