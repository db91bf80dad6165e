//! Reads of the extension's `blocking_log` table.

use policy::{BlockingLogEntry, PageWindow, INFRA_NOISE_REASON};
use supabase_client::{Session, SupabaseClient, TableQuery};
use tracing::debug;

use crate::error::Result;

/// Table the extension appends decisions to.
pub const BLOCKING_LOG_TABLE: &str = "blocking_log";

/// PostgREST disjunction excluding infrastructure entries. A null reason
/// is kept, since `neq` alone would drop it.
fn not_infra_noise() -> String {
    format!("(reason.is.null,reason.neq.\"{}\")", INFRA_NOISE_REASON)
}

/// Base query: the session user's visible entries, newest first.
fn visible_entries(session: &Session) -> TableQuery {
    TableQuery::new(BLOCKING_LOG_TABLE)
        .select("*")
        .eq("user_id", session.user_id())
        .or(&not_infra_noise())
        .order_desc("created_at")
}

/// Fetch the `limit` most recent visible entries.
pub async fn recent_entries(
    client: &SupabaseClient,
    session: &Session,
    limit: usize,
) -> Result<Vec<BlockingLogEntry>> {
    let query = visible_entries(session).limit(limit as u64);
    let mut entries: Vec<BlockingLogEntry> = client.select(&query, session.access_token()).await?;
    entries.retain(|e| !e.is_infra_noise());

    debug!(user_id = %session.user_id(), count = entries.len(), "Loaded recent entries");
    Ok(entries)
}

/// Count the session user's visible entries.
pub async fn count_entries(client: &SupabaseClient, session: &Session) -> Result<u64> {
    let query = TableQuery::new(BLOCKING_LOG_TABLE)
        .select("id")
        .eq("user_id", session.user_id())
        .or(&not_infra_noise());

    Ok(client.count(&query, session.access_token()).await?)
}

/// Fetch one page of history together with the total entry count.
pub async fn page(
    client: &SupabaseClient,
    session: &Session,
    page_index: usize,
    page_size: usize,
) -> Result<(Vec<BlockingLogEntry>, PageWindow)> {
    let total = count_entries(client, session).await?;
    let window = PageWindow::new(page_index, page_size, total);

    let query = visible_entries(session)
        .offset(window.offset())
        .limit(window.size as u64);
    let mut entries: Vec<BlockingLogEntry> = client.select(&query, session.access_token()).await?;
    entries.retain(|e| !e.is_infra_noise());

    debug!(
        user_id = %session.user_id(),
        page = page_index,
        total,
        count = entries.len(),
        "Loaded history page"
    );
    Ok((entries, window))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_filter_quotes_reserved_characters() {
        assert_eq!(
            not_infra_noise(),
            "(reason.is.null,reason.neq.\"System Rule (Infra)\")"
        );
    }
}
