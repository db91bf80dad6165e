//! Error types for the dashboard.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use thiserror::Error;

/// Errors that can occur in the dashboard.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    /// Auth or backend error outside the store.
    #[error("Backend error: {0}")]
    Supabase(#[from] supabase_client::SupabaseError),

    /// No signed-in session.
    #[error("Not signed in")]
    Unauthenticated,

    /// The session ended while the request was in flight.
    #[error("Session changed during the request")]
    SessionChanged,

    /// The browser session store failed.
    #[error("Session store error: {0}")]
    SessionStore(#[from] tower_sessions::session::Error),
}

impl DashboardError {
    /// Whether the backend rejected the session's token.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            DashboardError::Store(store::StoreError::Supabase(err))
            | DashboardError::Supabase(err) => err.is_unauthorized(),
            DashboardError::Unauthenticated | DashboardError::SessionChanged => true,
            _ => false,
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            DashboardError::Unauthenticated | DashboardError::SessionChanged => {
                return Redirect::to("/login").into_response();
            }
            DashboardError::Store(err) => {
                tracing::error!("Store error: {}", err);
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            DashboardError::Supabase(err) => {
                tracing::error!("Backend error: {}", err);
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            DashboardError::SessionStore(err) => {
                tracing::error!("Session store error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for dashboard handlers.
pub type Result<T> = std::result::Result<T, DashboardError>;
