//! Error types for supabase-client.

use thiserror::Error;

/// Errors that can occur when talking to Supabase.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error response from the auth or REST API.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Health check failed.
    #[error("Health check failed")]
    HealthCheckFailed,

    /// Realtime stream error.
    #[error("Realtime error: {0}")]
    Realtime(String),

    /// Response was missing something the client relies on.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SupabaseError {
    /// Whether the backend rejected the credentials or token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SupabaseError::Api { status: 401 | 403, .. })
    }
}
