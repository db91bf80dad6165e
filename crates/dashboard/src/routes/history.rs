//! Full blocking history.

use askama::Template;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use policy::PageWindow;
use serde::Deserialize;
use store::blocking_log;
use tracing::{debug, warn};

use super::session_expired;
use crate::error::{DashboardError, Result};
use crate::session::SessionContext;
use crate::state::AppState;
use crate::views::{Flash, LogRow};

/// History page template.
#[derive(Template)]
#[template(path = "history.html")]
pub struct HistoryTemplate {
    pub flash: Flash,
    pub entries: Vec<LogRow>,
    pub window: PageWindow,
}

impl HistoryTemplate {
    fn previous_page(&self) -> usize {
        self.window.index.saturating_sub(1)
    }

    fn next_page(&self) -> usize {
        self.window.next_index()
    }
}

/// `?page=N`, zero-based.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub page: usize,
}

/// Render one page of history.
pub async fn history_page(
    State(state): State<AppState>,
    context: SessionContext,
    Query(query): Query<HistoryQuery>,
) -> Result<Response> {
    let page_size = state.config.history_page_size;
    let result =
        blocking_log::page(state.store.client(), &context.session, query.page, page_size).await;

    // Results for a sign-in that ended meanwhile belong to nobody. A token
    // refresh in between keeps the page.
    if !state.sessions.is_current(&context).await {
        debug!(generation = context.generation, "Discarding stale history page");
        return Err(DashboardError::SessionChanged);
    }

    let template = match result {
        Ok((entries, window)) => HistoryTemplate {
            flash: Flash::default(),
            entries: entries.iter().map(LogRow::from).collect(),
            window,
        },
        Err(err) => {
            let err = DashboardError::from(err);
            if err.is_unauthorized() {
                return Ok(session_expired(&state, &context).await);
            }
            warn!(user_id = %context.user_id(), page = query.page, "Failed to load history: {}", err);
            HistoryTemplate {
                flash: Flash::error(format!("Could not load your history: {}", err)),
                entries: Vec::new(),
                window: PageWindow::new(query.page, page_size, 0),
            }
        }
    };

    Ok(template.into_response())
}
