//! Per-user persistence for the AI Blocker dashboard.
//!
//! Every operation takes the caller's [`Session`](supabase_client::Session)
//! and is scoped to that session's user id; there is no way to read or
//! write another user's rows through this crate.
//!
//! # Example
//!
//! ```no_run
//! use store::{blocking_log, rules, Store};
//! use supabase_client::SupabaseConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::connect(SupabaseConfig::from_env()?).await?;
//!     let session = store
//!         .client()
//!         .sign_in_with_password("me@example.com", "hunter22")
//!         .await?;
//!
//!     let policy = rules::load_policy(store.client(), &session).await?;
//!     println!("{} blocked domains", policy.block_list.len());
//!
//!     let recent = blocking_log::recent_entries(store.client(), &session, 20).await?;
//!     println!("{} recent decisions", recent.len());
//!     Ok(())
//! }
//! ```

pub mod blocking_log;
pub mod error;
pub mod rules;

pub use error::{Result, StoreError};
pub use rules::RulesUpdate;

use supabase_client::{SupabaseClient, SupabaseConfig};

/// Backend connection wrapper.
#[derive(Debug, Clone)]
pub struct Store {
    client: SupabaseClient,
}

impl Store {
    /// Connect to the backend, verifying it is reachable.
    pub async fn connect(config: SupabaseConfig) -> Result<Self> {
        let client = SupabaseClient::connect(config).await?;
        tracing::info!("Store ready");
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Get a reference to the backend client.
    pub fn client(&self) -> &SupabaseClient {
        &self.client
    }
}
