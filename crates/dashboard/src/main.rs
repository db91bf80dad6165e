//! AI Blocker web dashboard.
//!
//! Server-rendered pages for editing the blocking policy, plus a live
//! activity panel fed over Server-Sent Events.

mod config;
mod error;
mod reconciler;
mod routes;
mod session;
mod state;
mod views;

use std::time::Duration;

use store::Store;
use supabase_client::AuthEvent;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::session::SessionManager;
use crate::state::AppState;

const IDLE_SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, public_url = %config.public_url, "Starting dashboard");

    // Connect to backend
    let store = Store::connect(config.supabase.clone()).await?;

    // Build application state
    let addr = config.addr;
    let cookie_layer = session::cookie_layer(&config);
    let session_idle = config.session_idle;
    let state = AppState::new(store, config);
    log_auth_events(state.sessions.subscribe());
    expire_idle_sessions(state.sessions.clone(), session_idle);

    // Build router
    let app = routes::router()
        .nest_service(
            "/static",
            ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static")),
        )
        .layer(cookie_layer)
        .with_state(state);

    // Start server
    info!(addr = %addr, "Dashboard listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Log every auth state change.
fn log_auth_events(mut events: broadcast::Receiver<AuthEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let kind = match &event {
                        AuthEvent::SignedIn { .. } => "signed_in",
                        AuthEvent::SignedOut { .. } => "signed_out",
                        AuthEvent::PasswordRecovery { .. } => "password_recovery",
                        AuthEvent::UserUpdated { .. } => "user_updated",
                    };
                    info!(user_id = %event.user_id(), event = kind, "Auth state changed");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Auth event log fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Periodically drop sign-ins that have gone unused.
fn expire_idle_sessions(sessions: SessionManager, max_idle: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(IDLE_SWEEP_PERIOD);
        loop {
            ticker.tick().await;
            let expired = sessions.expire_idle(max_idle).await;
            if expired > 0 {
                debug!(expired, "Expired idle sessions");
            }
        }
    });
}
