//! Recent activity feed.
//!
//! The feed is fed by two independent sources: a one-shot fetch of the most
//! recent entries and an open-ended stream of live inserts. Either may
//! arrive first, and the same row can be delivered by both. [`ActivityFeed`]
//! reduces those events into one newest-first list without duplicates or
//! infrastructure noise.

use std::collections::HashSet;

use crate::models::BlockingLogEntry;

/// Inputs to the feed reducer.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Result of the initial (or a repeated) recent-entries fetch.
    InitialLoaded(Vec<BlockingLogEntry>),
    /// A row reported by the live change feed.
    LiveInserted(BlockingLogEntry),
    /// The session changed; forget everything.
    Reset,
}

/// Newest-first, de-duplicated view of blocking decisions.
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    entries: Vec<BlockingLogEntry>,
    ids: HashSet<String>,
    initial_limit: usize,
    loaded: bool,
}

impl ActivityFeed {
    /// Create an empty feed that keeps at most `initial_limit` entries from
    /// each initial load. Live inserts are not capped.
    pub fn new(initial_limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            ids: HashSet::new(),
            initial_limit,
            loaded: false,
        }
    }

    /// Apply an event. Returns whether the visible entries changed.
    pub fn apply(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::InitialLoaded(batch) => self.merge_initial(batch),
            FeedEvent::LiveInserted(entry) => self.insert_live(entry),
            FeedEvent::Reset => self.reset(),
        }
    }

    /// Visible entries, newest first.
    pub fn entries(&self) -> &[BlockingLogEntry] {
        &self.entries
    }

    /// Whether an initial load has completed since the last reset.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Number of visible entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are visible.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn merge_initial(&mut self, mut batch: Vec<BlockingLogEntry>) -> bool {
        let first_load = !self.loaded;
        self.loaded = true;

        batch.retain(|e| !e.is_infra_noise());
        batch.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        batch.truncate(self.initial_limit);

        let mut changed = false;
        for entry in batch {
            if self.ids.insert(entry.id.clone()) {
                self.entries.push(entry);
                changed = true;
            }
        }

        if changed {
            // Live rows that beat the initial fetch stay; order by time.
            self.entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }

        changed || first_load
    }

    fn insert_live(&mut self, entry: BlockingLogEntry) -> bool {
        if entry.is_infra_noise() {
            tracing::debug!(id = %entry.id, "Dropping infrastructure log entry");
            return false;
        }

        if !self.ids.insert(entry.id.clone()) {
            tracing::debug!(id = %entry.id, "Ignoring duplicate log entry");
            return false;
        }

        self.entries.insert(0, entry);
        true
    }

    fn reset(&mut self) -> bool {
        let changed = !self.entries.is_empty() || self.loaded;
        self.entries.clear();
        self.ids.clear();
        self.loaded = false;
        changed
    }
}
