//! Auth API: sign-up, sign-in, OAuth, recovery and session management.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::client::SupabaseClient;
use crate::error::SupabaseError;
use crate::types::auth::TokenResponse;
use crate::types::{OAuthProvider, Session, SignUpOutcome, User};

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(User),
}

impl SupabaseClient {
    /// Register a new user with email and password.
    ///
    /// `redirect_to` is where the confirmation link sends the browser.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, SupabaseError> {
        let mut request = self
            .anon(self.http_client().post(self.config().auth_url("signup")))
            .json(&json!({ "email": email, "password": password }));
        if let Some(redirect_to) = redirect_to {
            request = request.query(&[("redirect_to", redirect_to)]);
        }

        let response = Self::check(request.send().await?).await?;
        let outcome = match response.json::<SignUpResponse>().await? {
            SignUpResponse::Session(token) => SignUpOutcome::SignedIn(token.into()),
            SignUpResponse::User(user) => SignUpOutcome::ConfirmationSent(user),
        };

        info!("Sign-up accepted");
        Ok(outcome)
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, SupabaseError> {
        let request = self
            .anon(self.http_client().post(self.config().auth_url("token")))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        let response = Self::check(request.send().await?).await?;
        let token: TokenResponse = response.json().await?;
        debug!(user_id = %token.user.id, "Password sign-in succeeded");
        Ok(token.into())
    }

    /// Exchange a refresh token for a new session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, SupabaseError> {
        let request = self
            .anon(self.http_client().post(self.config().auth_url("token")))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));

        let response = Self::check(request.send().await?).await?;
        let token: TokenResponse = response.json().await?;
        Ok(token.into())
    }

    /// URL the browser should visit to sign in with an OAuth provider.
    pub fn oauth_authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> String {
        self.config().authorize_url(provider.as_str(), redirect_to)
    }

    /// Build a session from tokens handed back by an OAuth or recovery
    /// redirect, validating them against the auth API.
    pub async fn session_from_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_at: Option<i64>,
    ) -> Result<Session, SupabaseError> {
        let user = self.get_user(access_token).await?;
        Ok(Session::new(access_token, refresh_token, expires_at, user))
    }

    /// Send a password recovery email.
    pub async fn recover_password(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), SupabaseError> {
        let request = self
            .anon(self.http_client().post(self.config().auth_url("recover")))
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }));

        Self::check(request.send().await?).await?;
        info!("Password recovery email requested");
        Ok(())
    }

    /// Fetch the user owning an access token.
    pub async fn get_user(&self, access_token: &str) -> Result<User, SupabaseError> {
        let request = self.authed(
            self.http_client().get(self.config().auth_url("user")),
            access_token,
        );

        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Set a new password for the signed-in user.
    pub async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<User, SupabaseError> {
        let request = self
            .authed(
                self.http_client().put(self.config().auth_url("user")),
                access_token,
            )
            .json(&json!({ "password": new_password }));

        let response = Self::check(request.send().await?).await?;
        let user: User = response.json().await?;
        info!(user_id = %user.id, "Password updated");
        Ok(user)
    }

    /// Revoke the session's tokens.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), SupabaseError> {
        let request = self.authed(
            self.http_client().post(self.config().auth_url("logout")),
            access_token,
        );

        Self::check(request.send().await?).await?;
        Ok(())
    }
}
