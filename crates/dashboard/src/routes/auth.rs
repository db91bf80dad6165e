//! Sign in, sign up, OAuth, password recovery and sign out.

use askama::Template;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use supabase_client::{AuthEvent, OAuthProvider, Session, SignUpOutcome, SupabaseError};
use tower_sessions::Session as CookieSession;
use tracing::{error, info, warn};

use super::{action_failed, redirect_error, redirect_notice};
use crate::session::SessionContext;
use crate::state::AppState;
use crate::views::Flash;

const MIN_PASSWORD_LENGTH: usize = 6;

/// Sign-in / sign-up page.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub flash: Flash,
}

/// Landing page for OAuth and recovery redirects. The tokens arrive in the
/// URL fragment, which only the browser can read.
#[derive(Template)]
#[template(path = "auth_callback.html")]
pub struct AuthCallbackTemplate {
    /// Where the page posts the tokens.
    pub session_endpoint: &'static str,
}

/// Request a recovery email.
#[derive(Template)]
#[template(path = "forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub flash: Flash,
}

/// Set a new password.
#[derive(Template)]
#[template(path = "reset_password.html")]
pub struct ResetPasswordTemplate {
    pub email: String,
    pub flash: Flash,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct EmailForm {
    pub email: String,
}

#[derive(Deserialize)]
pub struct NewPasswordForm {
    pub password: String,
    pub confirm: String,
}

/// Tokens lifted from the callback fragment.
#[derive(Deserialize)]
pub struct TokenForm {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// `recovery` for password reset links.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Render the sign-in page; signed-in users go straight to the dashboard.
pub async fn login_page(context: Option<SessionContext>, Query(flash): Query<Flash>) -> Response {
    if context.is_some() {
        return Redirect::to("/").into_response();
    }
    LoginTemplate { flash }.into_response()
}

/// Sign in with email and password.
pub async fn login(
    State(state): State<AppState>,
    cookie: CookieSession,
    Form(form): Form<Credentials>,
) -> Response {
    let email = form.email.trim();
    match state
        .store
        .client()
        .sign_in_with_password(email, &form.password)
        .await
    {
        Ok(session) => start_session(&state, &cookie, session, false).await,
        Err(err) => {
            warn!("Sign-in failed: {}", err);
            redirect_error("/login", &auth_failure_message(&err))
        }
    }
}

/// Register with email and password.
pub async fn signup(
    State(state): State<AppState>,
    cookie: CookieSession,
    Form(form): Form<Credentials>,
) -> Response {
    let email = form.email.trim();
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return redirect_error(
            "/login",
            &format!("Password must be at least {} characters.", MIN_PASSWORD_LENGTH),
        );
    }

    let redirect_to = state.config.public_link("/auth/callback");
    match state
        .store
        .client()
        .sign_up(email, &form.password, Some(&redirect_to))
        .await
    {
        Ok(SignUpOutcome::SignedIn(session)) => {
            start_session(&state, &cookie, session, false).await
        }
        Ok(SignUpOutcome::ConfirmationSent(user)) => {
            info!(user_id = %user.id, "Confirmation email sent");
            redirect_notice("/login", "Check your email for the confirmation link.")
        }
        Err(err) => {
            warn!("Sign-up failed: {}", err);
            redirect_error("/login", &auth_failure_message(&err))
        }
    }
}

/// Start Google sign-in.
pub async fn google(State(state): State<AppState>) -> Redirect {
    let redirect_to = state.config.public_link("/auth/callback");
    let url = state
        .store
        .client()
        .oauth_authorize_url(OAuthProvider::Google, &redirect_to);
    Redirect::to(&url)
}

/// Render the redirect landing page.
pub async fn callback_page() -> AuthCallbackTemplate {
    AuthCallbackTemplate {
        session_endpoint: "/auth/session",
    }
}

/// Turn tokens from a redirect into the active session.
pub async fn establish_session(
    State(state): State<AppState>,
    cookie: CookieSession,
    Form(form): Form<TokenForm>,
) -> Response {
    let session = match state
        .store
        .client()
        .session_from_tokens(&form.access_token, &form.refresh_token, form.expires_at)
        .await
    {
        Ok(session) => session,
        Err(err) => {
            warn!("Rejected callback tokens: {}", err);
            return redirect_error("/login", "That sign-in link is invalid or has expired.");
        }
    };

    let recovery = form.kind.as_deref() == Some("recovery");
    start_session(&state, &cookie, session, recovery).await
}

/// Bind a new sign-in to the browser and send it on. Recovery sign-ins go
/// to the new-password form.
async fn start_session(
    state: &AppState,
    cookie: &CookieSession,
    session: Session,
    recovery: bool,
) -> Response {
    let user_id = session.user_id().to_string();
    let (event, next) = if recovery {
        (AuthEvent::PasswordRecovery { user_id }, "/reset-password")
    } else {
        (AuthEvent::SignedIn { user_id }, "/")
    };

    match state.sessions.sign_in(cookie, session, event).await {
        Ok(_) => Redirect::to(next).into_response(),
        Err(err) => {
            error!("Could not start session: {}", err);
            redirect_error("/login", "Could not start your session. Please try again.")
        }
    }
}

/// Render the recovery request form.
pub async fn forgot_password_page(Query(flash): Query<Flash>) -> ForgotPasswordTemplate {
    ForgotPasswordTemplate { flash }
}

/// Send a recovery email.
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<EmailForm>,
) -> Response {
    let redirect_to = state.config.public_link("/auth/callback");
    match state
        .store
        .client()
        .recover_password(form.email.trim(), &redirect_to)
        .await
    {
        Ok(()) => redirect_notice(
            "/forgot-password",
            "If an account exists for that address, a reset link is on its way.",
        ),
        Err(err) => {
            warn!("Recovery request failed: {}", err);
            redirect_error("/forgot-password", &auth_failure_message(&err))
        }
    }
}

/// Render the new-password form.
pub async fn reset_password_page(
    context: SessionContext,
    Query(flash): Query<Flash>,
) -> ResetPasswordTemplate {
    ResetPasswordTemplate {
        email: context.session.user.email.clone().unwrap_or_default(),
        flash,
    }
}

/// Set a new password for the signed-in user.
pub async fn reset_password(
    State(state): State<AppState>,
    context: SessionContext,
    Form(form): Form<NewPasswordForm>,
) -> Response {
    if let Err(message) = validate_new_password(&form.password, &form.confirm) {
        return redirect_error("/reset-password", message);
    }

    match state
        .store
        .client()
        .update_password(context.session.access_token(), &form.password)
        .await
    {
        Ok(_) => {
            state.sessions.user_updated(&context);
            redirect_notice("/", "Password updated.")
        }
        Err(err) => {
            action_failed(&state, &context, "/reset-password", "update your password", err).await
        }
    }
}

/// Sign out this browser and revoke its session's tokens.
pub async fn logout(State(state): State<AppState>, cookie: CookieSession) -> Response {
    let ended = match state.sessions.sign_out(&cookie).await {
        Ok(ended) => ended,
        Err(err) => {
            error!("Could not clear session cookie: {}", err);
            return redirect_error("/login", "Could not sign you out. Please try again.");
        }
    };

    if let Some(context) = ended {
        if let Err(err) = state
            .store
            .client()
            .sign_out(context.session.access_token())
            .await
        {
            // The local session is gone either way.
            warn!(user_id = %context.user_id(), "Token revocation failed: {}", err);
        }
    }
    redirect_notice("/login", "Signed out.")
}

fn validate_new_password(password: &str, confirm: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 6 characters.");
    }
    if password != confirm {
        return Err("Passwords do not match.");
    }
    Ok(())
}

fn auth_failure_message(err: &SupabaseError) -> String {
    match err {
        SupabaseError::Api { message, .. } => message.clone(),
        _ => "Could not reach the server. Please try again.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_new_password() {
        assert!(validate_new_password("secret", "secret").is_ok());
        assert_eq!(
            validate_new_password("short", "short"),
            Err("Password must be at least 6 characters.")
        );
        assert_eq!(
            validate_new_password("secret1", "secret2"),
            Err("Passwords do not match.")
        );
    }

    #[test]
    fn test_auth_failure_message_prefers_api_message() {
        let err = SupabaseError::Api {
            status: 400,
            message: "Invalid login credentials".to_string(),
        };
        assert_eq!(auth_failure_message(&err), "Invalid login credentials");
        assert_eq!(
            auth_failure_message(&SupabaseError::HealthCheckFailed),
            "Could not reach the server. Please try again."
        );
    }

    #[test]
    fn test_token_form_reads_recovery_type() {
        let form: TokenForm = serde_json::from_value(serde_json::json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_at": 1_800_000_000,
            "type": "recovery"
        }))
        .unwrap();

        assert_eq!(form.kind.as_deref(), Some("recovery"));
        assert_eq!(form.expires_at, Some(1_800_000_000));
    }
}
