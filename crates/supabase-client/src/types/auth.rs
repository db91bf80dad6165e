//! Auth types.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User UUID; every table row is scoped by it.
    pub id: String,

    /// Email address, if the provider shared one.
    #[serde(default)]
    pub email: Option<String>,

    /// When the email was confirmed.
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
}

/// A signed-in session.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: SecretString,
    refresh_token: SecretString,
    /// Expiry as unix seconds, when known.
    pub expires_at: Option<i64>,
    /// The session's user.
    pub user: User,
}

impl Session {
    /// Create a session from raw tokens.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: Option<i64>,
        user: User,
    ) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
            expires_at,
            user,
        }
    }

    /// Bearer token for authenticated requests (exposes the secret).
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Token used to obtain a fresh session (exposes the secret).
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose_secret()
    }

    /// Id of the signed-in user.
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

/// Token grant response from the auth API.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        Session::new(
            token.access_token,
            token.refresh_token,
            token.expires_at,
            token.user,
        )
    }
}

/// Result of a sign-up request.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// Email confirmation is disabled; the user is signed in.
    SignedIn(Session),
    /// A confirmation email was sent; the user must follow it first.
    ConfirmationSent(User),
}

/// External identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
}

impl OAuthProvider {
    /// Provider identifier used by the auth API.
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
        }
    }
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A user signed in (password, OAuth or sign-up).
    SignedIn { user_id: String },
    /// The session ended.
    SignedOut { user_id: String },
    /// A recovery link was followed; the user should set a new password.
    PasswordRecovery { user_id: String },
    /// The user's password or profile changed.
    UserUpdated { user_id: String },
}

impl AuthEvent {
    /// User the event refers to.
    pub fn user_id(&self) -> &str {
        match self {
            AuthEvent::SignedIn { user_id }
            | AuthEvent::SignedOut { user_id }
            | AuthEvent::PasswordRecovery { user_id }
            | AuthEvent::UserUpdated { user_id } => user_id,
        }
    }
}
