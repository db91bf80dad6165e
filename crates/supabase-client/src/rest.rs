//! Table store API (PostgREST).

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::client::SupabaseClient;
use crate::error::SupabaseError;

/// A filtered, ordered, ranged read of one table.
///
/// # Example
///
/// ```
/// use supabase_client::TableQuery;
///
/// let query = TableQuery::new("blocking_log")
///     .eq("user_id", "c27fb365")
///     .order_desc("created_at")
///     .limit(20);
/// assert_eq!(query.table(), "blocking_log");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    table: String,
    params: Vec<(String, String)>,
}

impl TableQuery {
    /// Start a query selecting all columns.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            params: Vec::new(),
        }
    }

    /// Restrict the returned columns.
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    /// `column = value`.
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.params
            .push((column.to_string(), format!("eq.{}", value)));
        self
    }

    /// Raw disjunction, e.g. `(reason.is.null,reason.neq.x)`.
    pub fn or(mut self, expression: &str) -> Self {
        self.params.push(("or".to_string(), expression.to_string()));
        self
    }

    /// Newest first on a column.
    pub fn order_desc(mut self, column: &str) -> Self {
        self.params
            .push(("order".to_string(), format!("{}.desc", column)));
        self
    }

    /// Maximum rows returned.
    pub fn limit(mut self, limit: u64) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    /// Rows skipped before the first returned row.
    pub fn offset(mut self, offset: u64) -> Self {
        self.params.push(("offset".to_string(), offset.to_string()));
        self
    }

    /// Target table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Query string parameters, unencoded.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Parse the total from a `Content-Range` header (`0-49/120`, `*/120`).
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.rsplit_once('/')?;
    total.trim().parse().ok()
}

impl SupabaseClient {
    /// Run a select and decode every row.
    pub async fn select<T: DeserializeOwned>(
        &self,
        query: &TableQuery,
        access_token: &str,
    ) -> Result<Vec<T>, SupabaseError> {
        debug!(table = %query.table(), "REST select");

        let request = self
            .authed(
                self.http_client().get(self.config().rest_url(query.table())),
                access_token,
            )
            .query(query.params());

        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Count the rows matching a query without fetching them.
    pub async fn count(&self, query: &TableQuery, access_token: &str) -> Result<u64, SupabaseError> {
        debug!(table = %query.table(), "REST count");

        let request = self
            .authed(
                self.http_client().head(self.config().rest_url(query.table())),
                access_token,
            )
            .header("Prefer", "count=exact")
            .query(query.params());

        let response = Self::check(request.send().await?).await?;
        let header = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                SupabaseError::UnexpectedResponse("missing Content-Range header".to_string())
            })?;

        parse_content_range_total(header).ok_or_else(|| {
            SupabaseError::UnexpectedResponse(format!("unparseable Content-Range: {}", header))
        })
    }

    /// Insert a row, or merge it into the existing row with the same
    /// `on_conflict` key. Columns absent from `row` are left untouched.
    pub async fn upsert<B: Serialize + ?Sized>(
        &self,
        table: &str,
        on_conflict: &str,
        row: &B,
        access_token: &str,
    ) -> Result<(), SupabaseError> {
        debug!(table = %table, on_conflict = %on_conflict, "REST upsert");

        let request = self
            .authed(
                self.http_client().post(self.config().rest_url(table)),
                access_token,
            )
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", on_conflict)])
            .json(row);

        Self::check(request.send().await?).await?;
        Ok(())
    }
}
