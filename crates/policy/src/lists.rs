//! Allow and block lists.

use serde::{Deserialize, Serialize};

use crate::domain::normalize_domain;
use crate::error::DomainError;

/// Result of adding an entry to a [`DomainList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The canonical domain was inserted.
    Added(String),
    /// The canonical domain was already on the list; nothing changed.
    AlreadyPresent(String),
}

impl AddOutcome {
    /// The canonical domain that was resolved.
    pub fn domain(&self) -> &str {
        match self {
            AddOutcome::Added(d) | AddOutcome::AlreadyPresent(d) => d,
        }
    }
}

/// A sorted set of canonical domains.
///
/// Stored as a plain JSON array. Whatever the store returns is sorted and
/// de-duplicated on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct DomainList {
    domains: Vec<String>,
}

impl DomainList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve user input and add it to the list.
    ///
    /// The list is untouched when the input is invalid or the domain is
    /// already present.
    pub fn add(&mut self, input: &str) -> Result<AddOutcome, DomainError> {
        let domain = normalize_domain(input)?;

        match self.domains.binary_search(&domain) {
            Ok(_) => Ok(AddOutcome::AlreadyPresent(domain)),
            Err(pos) => {
                self.domains.insert(pos, domain.clone());
                Ok(AddOutcome::Added(domain))
            }
        }
    }

    /// Remove an exact canonical domain. Returns whether anything was removed.
    pub fn remove(&mut self, domain: &str) -> bool {
        match self.domains.binary_search_by(|d| d.as_str().cmp(domain)) {
            Ok(pos) => {
                self.domains.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Whether an exact canonical domain is on the list.
    pub fn contains(&self, domain: &str) -> bool {
        self.domains
            .binary_search_by(|d| d.as_str().cmp(domain))
            .is_ok()
    }

    /// Domains in ascending order.
    pub fn as_slice(&self) -> &[String] {
        &self.domains
    }

    /// Iterate domains in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.domains.iter()
    }

    /// Number of domains.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl From<Vec<String>> for DomainList {
    fn from(mut domains: Vec<String>) -> Self {
        domains.sort();
        domains.dedup();
        Self { domains }
    }
}

impl From<DomainList> for Vec<String> {
    fn from(list: DomainList) -> Self {
        list.domains
    }
}
