//! Supabase client library.
//!
//! This crate provides a Rust client for a hosted Supabase project over
//! HTTP. It supports:
//!
//! - Email/password, OAuth and password-recovery auth flows
//! - Row select, exact count and upsert on the table store
//! - Row change notifications via Server-Sent Events
//!
//! # Example
//!
//! ```no_run
//! use supabase_client::{ChangeKind, Subscription, SupabaseClient, SupabaseConfig, TableQuery};
//!
//! # async fn example() -> Result<(), supabase_client::SupabaseError> {
//! let config = SupabaseConfig::from_env()?;
//! let client = SupabaseClient::connect(config).await?;
//!
//! let session = client.sign_in_with_password("me@example.com", "hunter22").await?;
//!
//! let query = TableQuery::new("rules").eq("user_id", session.user_id());
//! let rows: Vec<serde_json::Value> = client.select(&query, session.access_token()).await?;
//! println!("{} rule rows", rows.len());
//!
//! // Watch for new rows
//! use futures::StreamExt;
//! let subscription = Subscription::new("blocking_log", ChangeKind::Insert)
//!     .filter_eq("user_id", session.user_id());
//! let mut changes = supabase_client::subscribe(&client, subscription, session.access_token())?;
//! while let Some(result) = changes.next().await {
//!     match result {
//!         Ok(change) => println!("{:?} on {}", change.kind, change.table),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod realtime;
pub mod rest;
pub mod types;

pub use client::SupabaseClient;
pub use config::SupabaseConfig;
pub use error::SupabaseError;
pub use realtime::{subscribe, ChangeStream, ReconnectConfig, Subscription};
pub use rest::TableQuery;
pub use types::*;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
