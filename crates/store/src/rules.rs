//! The per-user `rules` row.

use policy::{BlockedCategories, DomainList, PolicyRecord};
use serde::Serialize;
use supabase_client::{Session, SupabaseClient, TableQuery};
use tracing::{debug, info};

use crate::error::{Result, StoreError};

/// Table holding one policy row per user.
pub const RULES_TABLE: &str = "rules";

/// Conflict key for upserts.
const RULES_KEY: &str = "user_id";

/// A partial write to the user's rules row.
///
/// Only the fields that are set are written; the rest of the row is left
/// as stored.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RulesUpdate {
    user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_categories: Option<BlockedCategories>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_list: Option<DomainList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_list: Option<DomainList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl RulesUpdate {
    /// An empty update for the session's user.
    pub fn for_session(session: &Session) -> Self {
        Self {
            user_id: session.user_id().to_string(),
            ..Self::default()
        }
    }

    /// Whether nothing but the key would be written.
    pub fn is_empty(&self) -> bool {
        self.prompt.is_none()
            && self.blocked_categories.is_none()
            && self.allow_list.is_none()
            && self.block_list.is_none()
            && self.api_key.is_none()
    }
}

/// Get the session user's rules row, if one exists.
pub async fn get_rules(client: &SupabaseClient, session: &Session) -> Result<Option<PolicyRecord>> {
    let query = TableQuery::new(RULES_TABLE)
        .select("*")
        .eq(RULES_KEY, session.user_id());

    let mut rows: Vec<PolicyRecord> = client.select(&query, session.access_token()).await?;

    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        count => Err(StoreError::Ambiguous {
            entity: "rules",
            id: session.user_id().to_string(),
            count,
        }),
    }
}

/// Load the session user's policy; a user without a row gets the defaults.
pub async fn load_policy(client: &SupabaseClient, session: &Session) -> Result<PolicyRecord> {
    match get_rules(client, session).await? {
        Some(record) => Ok(record),
        None => {
            info!(user_id = %session.user_id(), "No rules row yet, using defaults");
            Ok(PolicyRecord::empty(session.user_id()))
        }
    }
}

/// Create or update the session user's rules row.
pub async fn upsert_rules(
    client: &SupabaseClient,
    session: &Session,
    update: &RulesUpdate,
) -> Result<()> {
    if update.is_empty() {
        debug!(user_id = %session.user_id(), "Empty rules update, nothing to write");
        return Ok(());
    }

    debug!(user_id = %session.user_id(), "Upserting rules");

    client
        .upsert(RULES_TABLE, RULES_KEY, update, session.access_token())
        .await?;

    Ok(())
}

/// Save the blocking prompt.
pub async fn save_prompt(client: &SupabaseClient, session: &Session, prompt: &str) -> Result<()> {
    let update = RulesUpdate {
        prompt: Some(prompt.to_string()),
        ..RulesUpdate::for_session(session)
    };
    upsert_rules(client, session, &update).await
}

/// Save the category toggles.
pub async fn save_categories(
    client: &SupabaseClient,
    session: &Session,
    categories: &BlockedCategories,
) -> Result<()> {
    let update = RulesUpdate {
        blocked_categories: Some(categories.clone()),
        ..RulesUpdate::for_session(session)
    };
    upsert_rules(client, session, &update).await
}

/// Save the allow list.
pub async fn save_allow_list(
    client: &SupabaseClient,
    session: &Session,
    list: &DomainList,
) -> Result<()> {
    let update = RulesUpdate {
        allow_list: Some(list.clone()),
        ..RulesUpdate::for_session(session)
    };
    upsert_rules(client, session, &update).await
}

/// Save the block list.
pub async fn save_block_list(
    client: &SupabaseClient,
    session: &Session,
    list: &DomainList,
) -> Result<()> {
    let update = RulesUpdate {
        block_list: Some(list.clone()),
        ..RulesUpdate::for_session(session)
    };
    upsert_rules(client, session, &update).await
}

/// Store a new API key for the extension.
pub async fn save_api_key(client: &SupabaseClient, session: &Session, api_key: &str) -> Result<()> {
    let update = RulesUpdate {
        api_key: Some(api_key.to_string()),
        ..RulesUpdate::for_session(session)
    };
    upsert_rules(client, session, &update).await?;
    info!(user_id = %session.user_id(), "API key rotated");
    Ok(())
}
