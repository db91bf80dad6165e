//! Template view models.

use policy::{BlockedCategories, BlockingLogEntry, Category, LivenessStatus};
use serde::Deserialize;

/// One-shot message carried in the query string after a redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Flash {
    #[serde(default)]
    pub notice: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Flash {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            notice: None,
            error: Some(message.into()),
        }
    }
}

/// A blocking log entry as displayed.
#[derive(Debug, Clone)]
pub struct LogRow {
    pub decision: String,
    pub decision_class: String,
    pub title: String,
    pub url: String,
    pub reason: String,
    pub time: String,
}

impl From<&BlockingLogEntry> for LogRow {
    fn from(entry: &BlockingLogEntry) -> Self {
        Self {
            decision: entry.decision.clone(),
            decision_class: entry.decision_kind().as_str().to_string(),
            title: entry.display_title().to_string(),
            url: entry.url.clone(),
            reason: entry.reason.clone(),
            time: entry.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        }
    }
}

/// Extension status badge.
#[derive(Debug, Clone)]
pub struct StatusView {
    pub class: &'static str,
    pub headline: &'static str,
    pub detail: Option<String>,
}

impl From<&LivenessStatus> for StatusView {
    fn from(status: &LivenessStatus) -> Self {
        Self {
            class: status.as_str(),
            headline: status.headline(),
            detail: status.label().map(|label| format!("Last seen {}", label)),
        }
    }
}

/// A category checkbox.
#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub key: &'static str,
    pub label: &'static str,
    pub checked: bool,
}

/// Checkbox rows for every category, in display order.
pub fn category_rows(categories: &BlockedCategories) -> Vec<CategoryRow> {
    Category::ALL
        .into_iter()
        .map(|category| CategoryRow {
            key: category.as_str(),
            label: category.label(),
            checked: categories.is_blocked(category),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_row_falls_back_to_domain() {
        let entry = BlockingLogEntry {
            id: "7".to_string(),
            user_id: "user-1".to_string(),
            decision: "BLOCK".to_string(),
            url: "https://www.reddit.com/r/all".to_string(),
            domain: Some("reddit.com".to_string()),
            page_title: Some(String::new()),
            reason: "Social media".to_string(),
            created_at: "2026-10-19T08:05:00Z".parse().unwrap(),
        };

        let row = LogRow::from(&entry);
        assert_eq!(row.title, "reddit.com");
        assert_eq!(row.decision_class, "block");
        assert_eq!(row.time, "2026-10-19 08:05 UTC");
    }

    #[test]
    fn test_status_view() {
        let inactive = LivenessStatus::Inactive {
            label: "3 hours ago".to_string(),
        };
        let view = StatusView::from(&inactive);
        assert_eq!(view.class, "inactive");
        assert_eq!(view.detail.as_deref(), Some("Last seen 3 hours ago"));

        assert!(StatusView::from(&LivenessStatus::Active).detail.is_none());
    }

    #[test]
    fn test_category_rows_follow_toggles() {
        let categories = BlockedCategories::from_checked([Category::Games]);
        let rows = category_rows(&categories);

        assert_eq!(rows.len(), Category::ALL.len());
        assert!(rows.iter().any(|r| r.key == "games" && r.checked));
        assert_eq!(rows.iter().filter(|r| r.checked).count(), 1);
    }
}
