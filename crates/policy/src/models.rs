//! Stored data model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::lists::DomainList;

/// Reason written by the extension for its own infrastructure requests.
/// Entries carrying it are never shown to the user.
pub const INFRA_NOISE_REASON: &str = "System Rule (Infra)";

/// A user's blocking policy, one row per user in the `rules` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Owner of the record.
    pub user_id: String,
    /// Free-form instruction given to the AI.
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: String,
    /// Category toggles.
    #[serde(default, deserialize_with = "null_as_default")]
    pub blocked_categories: BlockedCategories,
    /// Domains that are always allowed.
    #[serde(default, deserialize_with = "null_as_default")]
    pub allow_list: DomainList,
    /// Domains that are always blocked.
    #[serde(default, deserialize_with = "null_as_default")]
    pub block_list: DomainList,
    /// Credential used by the extension; absent until first generated.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Last heartbeat written by the extension.
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl PolicyRecord {
    /// Default state for a user that has never saved anything.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            prompt: String::new(),
            blocked_categories: BlockedCategories::default(),
            allow_list: DomainList::new(),
            block_list: DomainList::new(),
            api_key: None,
            last_seen: None,
        }
    }
}

/// Fixed set of content categories the user can block wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Social,
    Shorts,
    News,
    Entertainment,
    Games,
    Shopping,
    Mature,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 7] = [
        Category::Social,
        Category::Shorts,
        Category::News,
        Category::Entertainment,
        Category::Games,
        Category::Shopping,
        Category::Mature,
    ];

    /// Identifier used in storage and form fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Social => "social",
            Category::Shorts => "shorts",
            Category::News => "news",
            Category::Entertainment => "entertainment",
            Category::Games => "games",
            Category::Shopping => "shopping",
            Category::Mature => "mature",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Social => "Social media",
            Category::Shorts => "Short-form video",
            Category::News => "News",
            Category::Entertainment => "Entertainment",
            Category::Games => "Games",
            Category::Shopping => "Shopping",
            Category::Mature => "Mature content",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

/// Category toggles, stored as a JSON object of `category -> bool`.
///
/// Missing keys read as `false`; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockedCategories {
    pub social: bool,
    pub shorts: bool,
    pub news: bool,
    pub entertainment: bool,
    pub games: bool,
    pub shopping: bool,
    pub mature: bool,
}

impl BlockedCategories {
    /// Whether a category is blocked.
    pub fn is_blocked(&self, category: Category) -> bool {
        match category {
            Category::Social => self.social,
            Category::Shorts => self.shorts,
            Category::News => self.news,
            Category::Entertainment => self.entertainment,
            Category::Games => self.games,
            Category::Shopping => self.shopping,
            Category::Mature => self.mature,
        }
    }

    /// Toggle a category.
    pub fn set(&mut self, category: Category, blocked: bool) {
        let slot = match category {
            Category::Social => &mut self.social,
            Category::Shorts => &mut self.shorts,
            Category::News => &mut self.news,
            Category::Entertainment => &mut self.entertainment,
            Category::Games => &mut self.games,
            Category::Shopping => &mut self.shopping,
            Category::Mature => &mut self.mature,
        };
        *slot = blocked;
    }

    /// Build toggles from the set of checked categories.
    pub fn from_checked<I>(checked: I) -> Self
    where
        I: IntoIterator<Item = Category>,
    {
        let mut categories = Self::default();
        for category in checked {
            categories.set(category, true);
        }
        categories
    }

    /// Categories currently blocked, in display order.
    pub fn blocked(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.is_blocked(*c))
            .collect()
    }
}

/// Outcome recorded for a page visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Block,
    /// Anything the extension writes that is not allow/block.
    Other(String),
}

impl Decision {
    /// Lower-case identifier, suitable for CSS classes.
    pub fn as_str(&self) -> &str {
        match self {
            Decision::Allow => "allow",
            Decision::Block => "block",
            Decision::Other(value) => value,
        }
    }
}

impl From<&str> for Decision {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "allow" | "allowed" => Decision::Allow,
            "block" | "blocked" => Decision::Block,
            other => Decision::Other(other.to_string()),
        }
    }
}

/// A single blocking decision written by the extension (`blocking_log`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingLogEntry {
    /// Opaque row identifier; numeric ids are kept as their decimal text.
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    /// Owner of the entry.
    pub user_id: String,
    /// Raw decision as written by the extension (e.g. "BLOCK").
    pub decision: String,
    /// Full page URL.
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    /// Domain of the page.
    #[serde(default)]
    pub domain: Option<String>,
    /// Page title, when the extension could read it.
    #[serde(default)]
    pub page_title: Option<String>,
    /// Explanation for the decision.
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
    /// When the decision was made.
    pub created_at: DateTime<Utc>,
}

impl BlockingLogEntry {
    /// Whether this entry is extension infrastructure traffic.
    pub fn is_infra_noise(&self) -> bool {
        self.reason == INFRA_NOISE_REASON
    }

    /// Parsed decision.
    pub fn decision_kind(&self) -> Decision {
        Decision::from(self.decision.as_str())
    }

    /// Best available short description of the page.
    pub fn display_title(&self) -> &str {
        self.page_title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.domain.as_deref().filter(|d| !d.is_empty()))
            .unwrap_or("Unknown Page")
    }
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Row ids may be bigints or uuids depending on the table definition.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
