//! Blocking policy model and the pure logic behind the AI Blocker dashboard.
//!
//! Nothing in this crate performs I/O. It provides:
//!
//! - The stored data model ([`PolicyRecord`], [`BlockingLogEntry`])
//! - Canonicalization of user-entered sites ([`normalize_domain`])
//! - Sorted, de-duplicated allow/block lists ([`DomainList`])
//! - The activity feed reducer ([`ActivityFeed`])
//! - History pagination ([`PageWindow`])
//! - Extension liveness classification ([`classify`])
//!
//! # Example
//!
//! ```
//! use policy::{normalize_domain, DomainList};
//!
//! assert_eq!(normalize_domain("https://www.bbc.co.uk/news").unwrap(), "bbc.co.uk");
//!
//! let mut blocked = DomainList::new();
//! blocked.add("youtube").unwrap();
//! blocked.add("YouTube.com").unwrap();
//! assert_eq!(blocked.as_slice(), ["youtube.com"]);
//! ```

pub mod api_key;
pub mod domain;
pub mod error;
pub mod feed;
pub mod lists;
pub mod liveness;
pub mod models;
pub mod pagination;

pub use api_key::{generate_api_key, API_KEY_LENGTH};
pub use domain::normalize_domain;
pub use error::DomainError;
pub use feed::{ActivityFeed, FeedEvent};
pub use lists::{AddOutcome, DomainList};
pub use liveness::{classify, LivenessStatus};
pub use models::{
    BlockedCategories, BlockingLogEntry, Category, Decision, PolicyRecord, INFRA_NOISE_REASON,
};
pub use pagination::PageWindow;
