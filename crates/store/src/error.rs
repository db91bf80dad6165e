//! Store error types.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend error (HTTP, API or decoding).
    #[error("backend error: {0}")]
    Supabase(#[from] supabase_client::SupabaseError),

    /// A single-row lookup matched several rows.
    #[error("expected at most one {entity} row for {id}, got {count}")]
    Ambiguous {
        entity: &'static str,
        id: String,
        count: usize,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
