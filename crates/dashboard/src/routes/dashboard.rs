//! Dashboard page and policy edit forms.

use std::collections::HashMap;
use std::fmt;

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Form;
use chrono::Utc;
use policy::{
    generate_api_key, AddOutcome, BlockedCategories, Category, DomainList, PolicyRecord,
};
use serde::Deserialize;
use store::rules;
use tracing::info;

use super::{action_failed, redirect_error, redirect_notice, session_expired};
use crate::error::DashboardError;
use crate::reconciler::DashboardSnapshot;
use crate::session::SessionContext;
use crate::state::AppState;
use crate::views::{category_rows, CategoryRow, Flash, LogRow, StatusView};

/// Dashboard page template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub email: String,
    pub flash: Flash,
    pub prompt: String,
    pub categories: Vec<CategoryRow>,
    pub allow_list: Vec<String>,
    pub block_list: Vec<String>,
    pub api_key: Option<String>,
    pub status: StatusView,
    pub activity: Vec<LogRow>,
    pub activity_loaded: bool,
}

impl DashboardTemplate {
    fn new(
        context: &SessionContext,
        policy: PolicyRecord,
        snapshot: &DashboardSnapshot,
        flash: Flash,
    ) -> Self {
        let flash = Flash {
            error: flash.error.or_else(|| snapshot.error.clone()),
            ..flash
        };

        Self {
            email: context.session.user.email.clone().unwrap_or_default(),
            flash,
            prompt: policy.prompt,
            categories: category_rows(&policy.blocked_categories),
            allow_list: policy.allow_list.as_slice().to_vec(),
            block_list: policy.block_list.as_slice().to_vec(),
            api_key: policy.api_key,
            status: StatusView::from(&snapshot.liveness),
            activity: snapshot.entries.iter().map(LogRow::from).collect(),
            activity_loaded: snapshot.loaded,
        }
    }
}

/// Which domain list a form edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Allow,
    Block,
}

impl ListKind {
    fn list_mut(self, policy: &mut PolicyRecord) -> &mut DomainList {
        match self {
            ListKind::Allow => &mut policy.allow_list,
            ListKind::Block => &mut policy.block_list,
        }
    }

    async fn save(
        self,
        state: &AppState,
        context: &SessionContext,
        list: &DomainList,
    ) -> store::Result<()> {
        let client = state.store.client();
        match self {
            ListKind::Allow => rules::save_allow_list(client, &context.session, list).await,
            ListKind::Block => rules::save_block_list(client, &context.session, list).await,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKind::Allow => f.write_str("allow"),
            ListKind::Block => f.write_str("block"),
        }
    }
}

#[derive(Deserialize)]
pub struct RuleForm {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Deserialize)]
pub struct DomainForm {
    #[serde(default)]
    pub domain: String,
}

#[derive(Deserialize)]
pub struct ApiKeyForm {
    #[serde(default)]
    pub confirm: Option<String>,
}

/// Render the dashboard page.
pub async fn dashboard_page(
    State(state): State<AppState>,
    context: SessionContext,
    Query(flash): Query<Flash>,
) -> Response {
    let snapshot = match state.sessions.snapshots(&context.key).await {
        Some(snapshots) => snapshots.borrow().clone(),
        None => DashboardSnapshot::empty(Utc::now()),
    };

    let (policy, flash) = match rules::load_policy(state.store.client(), &context.session).await {
        Ok(policy) => (policy, flash),
        Err(err) => {
            let err = DashboardError::from(err);
            if err.is_unauthorized() {
                return session_expired(&state, &context).await;
            }
            tracing::warn!(user_id = %context.user_id(), "Failed to load policy: {}", err);
            (
                PolicyRecord::empty(context.user_id()),
                Flash::error(format!("Could not load your settings: {}", err)),
            )
        }
    };

    DashboardTemplate::new(&context, policy, &snapshot, flash).into_response()
}

/// Save the blocking prompt.
pub async fn save_rule(
    State(state): State<AppState>,
    context: SessionContext,
    Form(form): Form<RuleForm>,
) -> Response {
    match rules::save_prompt(state.store.client(), &context.session, &form.prompt).await {
        Ok(()) => redirect_notice("/", "Rule saved successfully!"),
        Err(err) => action_failed(&state, &context, "/", "save your rule", err).await,
    }
}

/// Save the category toggles. Unchecked boxes are absent from the form.
pub async fn save_categories(
    State(state): State<AppState>,
    context: SessionContext,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let categories = checked_categories(&form);

    match rules::save_categories(state.store.client(), &context.session, &categories).await {
        Ok(()) => redirect_notice("/", "Categories saved."),
        Err(err) => action_failed(&state, &context, "/", "save your categories", err).await,
    }
}

/// Add a domain to the allow or block list.
pub async fn add_domain(
    State(state): State<AppState>,
    context: SessionContext,
    Path(kind): Path<ListKind>,
    Form(form): Form<DomainForm>,
) -> Response {
    let mut policy = match rules::load_policy(state.store.client(), &context.session).await {
        Ok(policy) => policy,
        Err(err) => return action_failed(&state, &context, "/", "update your list", err).await,
    };
    let list = kind.list_mut(&mut policy);

    match list.add(&form.domain) {
        Err(err) => redirect_error("/", &err.to_string()),
        Ok(AddOutcome::AlreadyPresent(domain)) => {
            redirect_notice("/", &format!("{} is already on your {} list.", domain, kind))
        }
        Ok(AddOutcome::Added(domain)) => match kind.save(&state, &context, list).await {
            Ok(()) => {
                info!(user_id = %context.user_id(), list = %kind, domain = %domain, "Domain added");
                redirect_notice("/", &format!("Added {} to your {} list.", domain, kind))
            }
            Err(err) => action_failed(&state, &context, "/", "update your list", err).await,
        },
    }
}

/// Remove a domain from the allow or block list. Removing an absent domain
/// changes nothing.
pub async fn remove_domain(
    State(state): State<AppState>,
    context: SessionContext,
    Path(kind): Path<ListKind>,
    Form(form): Form<DomainForm>,
) -> Response {
    let mut policy = match rules::load_policy(state.store.client(), &context.session).await {
        Ok(policy) => policy,
        Err(err) => return action_failed(&state, &context, "/", "update your list", err).await,
    };
    let list = kind.list_mut(&mut policy);

    if !list.remove(&form.domain) {
        return redirect_notice("/", &format!("{} is not on your {} list.", form.domain, kind));
    }

    match kind.save(&state, &context, list).await {
        Ok(()) => {
            info!(user_id = %context.user_id(), list = %kind, domain = %form.domain, "Domain removed");
            redirect_notice(
                "/",
                &format!("Removed {} from your {} list.", form.domain, kind),
            )
        }
        Err(err) => action_failed(&state, &context, "/", "update your list", err).await,
    }
}

/// Generate a new extension API key. Replacing an existing key requires the
/// confirmation box, since the old key stops working.
pub async fn regenerate_api_key(
    State(state): State<AppState>,
    context: SessionContext,
    Form(form): Form<ApiKeyForm>,
) -> Response {
    let policy = match rules::load_policy(state.store.client(), &context.session).await {
        Ok(policy) => policy,
        Err(err) => return action_failed(&state, &context, "/", "generate a key", err).await,
    };

    if policy.api_key.is_some() && form.confirm.is_none() {
        return redirect_error(
            "/",
            "Tick the confirmation box first. Regenerating will break your old key.",
        );
    }

    let api_key = generate_api_key();
    match rules::save_api_key(state.store.client(), &context.session, &api_key).await {
        Ok(()) => redirect_notice("/", "New API Key generated successfully!"),
        Err(err) => action_failed(&state, &context, "/", "generate a key", err).await,
    }
}

fn checked_categories(form: &HashMap<String, String>) -> BlockedCategories {
    BlockedCategories::from_checked(
        Category::ALL
            .into_iter()
            .filter(|category| form.contains_key(category.as_str())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_categories_ignores_unknown_fields() {
        let form: HashMap<String, String> = [
            ("social".to_string(), "on".to_string()),
            ("games".to_string(), "on".to_string()),
            ("crypto".to_string(), "on".to_string()),
        ]
        .into_iter()
        .collect();

        let categories = checked_categories(&form);
        assert_eq!(categories.blocked(), [Category::Social, Category::Games]);
    }

    #[test]
    fn test_list_kind_from_path() {
        let kind: ListKind = serde_json::from_str("\"allow\"").unwrap();
        assert_eq!(kind, ListKind::Allow);
        assert_eq!(ListKind::Block.to_string(), "block");

        let mut policy = PolicyRecord::empty("user-1");
        ListKind::Block.list_mut(&mut policy).add("youtube").unwrap();
        assert_eq!(policy.block_list.as_slice(), ["youtube.com"]);
        assert!(policy.allow_list.is_empty());
    }
}
