//! Route handlers for the dashboard.

pub mod activity;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod history;

use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use tracing::warn;

use crate::error::DashboardError;
use crate::session::SessionContext;
use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", post(auth::signup))
        .route("/auth/google", get(auth::google))
        .route("/auth/callback", get(auth::callback_page))
        .route("/auth/session", post(auth::establish_session))
        .route(
            "/forgot-password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route(
            "/reset-password",
            get(auth::reset_password_page).post(auth::reset_password),
        )
        .route("/logout", post(auth::logout))
        // HTML pages and forms
        .route("/", get(dashboard::dashboard_page))
        .route("/rule", post(dashboard::save_rule))
        .route("/categories", post(dashboard::save_categories))
        .route("/lists/:kind/add", post(dashboard::add_domain))
        .route("/lists/:kind/remove", post(dashboard::remove_domain))
        .route("/api-key", post(dashboard::regenerate_api_key))
        .route("/history", get(history::history_page))
        // Health check
        .route("/health", get(health::health))
        // API endpoints
        .route("/api/activity", get(activity::activity_api))
        .route("/api/activity/stream", get(activity::activity_stream))
        .route("/api/status", get(activity::status_api))
}

/// Redirect to `path` with a success message.
pub fn redirect_notice(path: &str, message: &str) -> Response {
    Redirect::to(&with_param(path, "notice", message)).into_response()
}

/// Redirect to `path` with an error message.
pub fn redirect_error(path: &str, message: &str) -> Response {
    Redirect::to(&with_param(path, "error", message)).into_response()
}

/// Report a failed form action. A rejected token ends the session.
pub async fn action_failed(
    state: &AppState,
    context: &SessionContext,
    path: &str,
    action: &str,
    err: impl Into<DashboardError>,
) -> Response {
    let err = err.into();
    if err.is_unauthorized() {
        return session_expired(state, context).await;
    }

    warn!(user_id = %context.user_id(), action, "Action failed: {}", err);
    redirect_error(path, &format!("Could not {}: {}", action, err))
}

/// End the browser's session and send it to sign in again.
pub async fn session_expired(state: &AppState, context: &SessionContext) -> Response {
    state.sessions.teardown(&context.key).await;
    redirect_error("/login", "Your session has expired. Please sign in again.")
}

fn with_param(path: &str, key: &str, value: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", path, separator, key, urlencoding::encode(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_param_encodes_message() {
        assert_eq!(
            with_param("/", "notice", "Rule saved successfully!"),
            "/?notice=Rule%20saved%20successfully%21"
        );
        assert_eq!(
            with_param("/history?page=2", "error", "a&b"),
            "/history?page=2&error=a%26b"
        );
    }
}
