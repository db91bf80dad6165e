//! Supabase HTTP client.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::SupabaseConfig;
use crate::error::SupabaseError;

/// Error body returned by the auth and REST APIs.
///
/// The auth API uses `msg`/`error_description`, PostgREST uses `message`.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiErrorBody {
    fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

/// Client for a Supabase project.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    config: SupabaseConfig,
}

impl SupabaseClient {
    /// Build a client without contacting the backend.
    pub fn new(config: SupabaseConfig) -> Result<Self, SupabaseError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(SupabaseError::Http)?;

        Ok(Self { http, config })
    }

    /// Build a client and verify the backend is reachable.
    pub async fn connect(config: SupabaseConfig) -> Result<Self, SupabaseError> {
        let client = Self::new(config)?;

        if client.health_check().await? {
            info!("Connected to Supabase at {}", client.config.base_url);
        } else {
            return Err(SupabaseError::HealthCheckFailed);
        }

        Ok(client)
    }

    /// Perform a health check against the auth service.
    pub async fn health_check(&self) -> Result<bool, SupabaseError> {
        let url = self.config.health_url();
        debug!("Health check: {}", url);

        let resp = self.anon(self.http.get(&url)).send().await?;
        Ok(resp.status().is_success())
    }

    /// Get the configuration.
    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    /// Get the underlying HTTP client.
    pub fn http_client(&self) -> &Client {
        &self.http
    }

    /// Attach the project key to a request.
    pub(crate) fn anon(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.config.anon_key())
            .bearer_auth(self.config.anon_key())
    }

    /// Attach the project key and a user's access token to a request.
    pub(crate) fn authed(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request
            .header("apikey", self.config.anon_key())
            .bearer_auth(access_token)
    }

    /// Turn a non-success response into [`SupabaseError::Api`].
    pub(crate) async fn check(response: Response) -> Result<Response, SupabaseError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(ApiErrorBody::into_message)
            .unwrap_or(body);

        Err(SupabaseError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_prefers_message() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned"}"#,
        )
        .unwrap();
        assert_eq!(
            body.into_message().as_deref(),
            Some("JSON object requested, multiple (or no) rows returned")
        );
    }

    #[test]
    fn test_error_body_auth_shapes() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invalid login credentials"));

        let body: ApiErrorBody =
            serde_json::from_str(r#"{"code":422,"msg":"Password should be at least 6 characters"}"#)
                .unwrap();
        assert_eq!(
            body.into_message().as_deref(),
            Some("Password should be at least 6 characters")
        );
    }
}
