//! Configuration types for supabase-client.

use std::env;

use secrecy::{ExposeSecret, SecretString};

use crate::error::SupabaseError;

/// Configuration for connecting to a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project base URL (e.g., "https://abcd.supabase.co"), no trailing slash.
    pub base_url: String,
    /// Public anon key sent as `apikey` on every request.
    anon_key: SecretString,
}

impl SupabaseConfig {
    /// Create a new configuration.
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            anon_key: SecretString::from(anon_key.into()),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL` - Project base URL
    /// - `SUPABASE_ANON_KEY` - Public anon key
    pub fn from_env() -> Result<Self, SupabaseError> {
        let base_url = env::var("SUPABASE_URL")
            .map_err(|_| SupabaseError::Config("SUPABASE_URL is required".to_string()))?;
        let anon_key = env::var("SUPABASE_ANON_KEY")
            .map_err(|_| SupabaseError::Config("SUPABASE_ANON_KEY is required".to_string()))?;

        if base_url.trim().is_empty() || anon_key.trim().is_empty() {
            return Err(SupabaseError::Config(
                "SUPABASE_URL and SUPABASE_ANON_KEY must not be empty".to_string(),
            ));
        }

        Ok(Self::new(base_url, anon_key))
    }

    /// Get the anon key (exposes the secret).
    pub(crate) fn anon_key(&self) -> &str {
        self.anon_key.expose_secret()
    }

    /// Get an auth endpoint URL.
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Get the REST endpoint URL for a table.
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Get the realtime events endpoint URL for a subscription.
    pub fn realtime_url(&self, table: &str, event: &str, filter: Option<&str>) -> String {
        let mut url = format!(
            "{}/realtime/v1/events?table={}&event={}",
            self.base_url,
            urlencoding::encode(table),
            urlencoding::encode(event)
        );
        if let Some(filter) = filter {
            url.push_str("&filter=");
            url.push_str(&urlencoding::encode(filter));
        }
        url
    }

    /// Get the OAuth authorize URL the browser is sent to.
    pub fn authorize_url(&self, provider: &str, redirect_to: &str) -> String {
        format!(
            "{}?provider={}&redirect_to={}",
            self.auth_url("authorize"),
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to)
        )
    }

    /// Get the health check endpoint URL.
    pub fn health_url(&self) -> String {
        self.auth_url("health")
    }
}
