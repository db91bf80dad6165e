//! Wire types exchanged with Supabase.

pub mod auth;
pub mod change;

pub use auth::{AuthEvent, OAuthProvider, Session, SignUpOutcome, User};
pub use change::{ChangeEvent, ChangeKind};
