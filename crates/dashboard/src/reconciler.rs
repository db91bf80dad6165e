//! Per-session state owner.
//!
//! One reconciler runs for each signed-in session. It is the only writer of
//! the activity feed and the heartbeat; every producer (initial load, change
//! feeds, liveness ticker) talks to it through an mpsc inbox, and readers
//! get [`DashboardSnapshot`]s through a watch channel.

use chrono::{DateTime, Utc};
use policy::{classify, ActivityFeed, BlockingLogEntry, FeedEvent, LivenessStatus};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Input to the reconciler.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Feed change (initial batch, live insert, reset).
    Feed(FeedEvent),
    /// Heartbeat value read from the rules row.
    Heartbeat(Option<DateTime<Utc>>),
    /// Periodic liveness re-evaluation.
    Tick,
    /// A background load failed; shown until the next successful update.
    LoadFailed(String),
}

/// Everything the activity panel and status badge render.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    /// Recent entries, newest first.
    pub entries: Vec<BlockingLogEntry>,
    /// Whether the initial batch has arrived.
    pub loaded: bool,
    /// Last extension heartbeat.
    pub last_seen: Option<DateTime<Utc>>,
    /// Extension status derived from `last_seen`.
    pub liveness: LivenessStatus,
    /// Latest background failure, if any.
    pub error: Option<String>,
    /// When this snapshot was produced.
    pub updated_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    /// Snapshot for a session whose data has not arrived yet.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            entries: Vec::new(),
            loaded: false,
            last_seen: None,
            liveness: LivenessStatus::Unknown,
            error: None,
            updated_at: now,
        }
    }
}

/// Reducer over [`SessionEvent`]s.
#[derive(Debug)]
pub struct Reconciler {
    feed: ActivityFeed,
    last_seen: Option<DateTime<Utc>>,
    liveness: LivenessStatus,
    error: Option<String>,
}

impl Reconciler {
    pub fn new(initial_limit: usize) -> Self {
        Self {
            feed: ActivityFeed::new(initial_limit),
            last_seen: None,
            liveness: LivenessStatus::Unknown,
            error: None,
        }
    }

    /// Apply one event at wall-clock `now`. Returns whether a new snapshot
    /// should be published.
    pub fn apply(&mut self, event: SessionEvent, now: DateTime<Utc>) -> bool {
        match event {
            SessionEvent::Feed(event) => {
                let reset = matches!(event, FeedEvent::Reset);
                let changed = self.feed.apply(event);
                if reset {
                    self.last_seen = None;
                    self.liveness = LivenessStatus::Unknown;
                    self.error = None;
                    return true;
                }
                if changed {
                    self.error = None;
                }
                changed
            }
            SessionEvent::Heartbeat(last_seen) => {
                self.last_seen = last_seen;
                self.reclassify(now);
                true
            }
            SessionEvent::Tick => self.reclassify(now),
            SessionEvent::LoadFailed(message) => {
                self.error = Some(message);
                true
            }
        }
    }

    /// Current state as a snapshot.
    pub fn snapshot(&self, now: DateTime<Utc>) -> DashboardSnapshot {
        DashboardSnapshot {
            entries: self.feed.entries().to_vec(),
            loaded: self.feed.is_loaded(),
            last_seen: self.last_seen,
            liveness: self.liveness.clone(),
            error: self.error.clone(),
            updated_at: now,
        }
    }

    fn reclassify(&mut self, now: DateTime<Utc>) -> bool {
        let status = classify(self.last_seen, now);
        if status == self.liveness {
            return false;
        }
        debug!(status = status.as_str(), "Liveness changed");
        self.liveness = status;
        true
    }
}

/// Drain the inbox until every sender is gone, publishing a snapshot after
/// each effective change.
pub async fn run(
    mut reconciler: Reconciler,
    mut inbox: mpsc::Receiver<SessionEvent>,
    snapshots: watch::Sender<DashboardSnapshot>,
) {
    while let Some(event) = inbox.recv().await {
        let now = Utc::now();
        if reconciler.apply(event, now) {
            snapshots.send_replace(reconciler.snapshot(now));
        }
    }
    info!("Reconciler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use policy::INFRA_NOISE_REASON;

    fn entry(id: &str, minutes_ago: i64, reason: &str) -> BlockingLogEntry {
        BlockingLogEntry {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            decision: "BLOCK".to_string(),
            url: format!("https://example.com/{}", id),
            domain: Some("example.com".to_string()),
            page_title: None,
            reason: reason.to_string(),
            created_at: now() - Duration::minutes(minutes_ago),
        }
    }

    fn now() -> DateTime<Utc> {
        "2026-10-19T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_live_insert_before_initial_load_survives() {
        let mut reconciler = Reconciler::new(20);

        assert!(reconciler.apply(
            SessionEvent::Feed(FeedEvent::LiveInserted(entry("9", 0, "Gaming"))),
            now()
        ));
        assert!(reconciler.apply(
            SessionEvent::Feed(FeedEvent::InitialLoaded(vec![
                entry("9", 0, "Gaming"),
                entry("8", 5, "Video"),
            ])),
            now()
        ));

        let snapshot = reconciler.snapshot(now());
        let ids: Vec<&str> = snapshot.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["9", "8"]);
        assert!(snapshot.loaded);
    }

    #[test]
    fn test_noise_insert_publishes_nothing() {
        let mut reconciler = Reconciler::new(20);
        let noise = entry("1", 0, INFRA_NOISE_REASON);

        assert!(!reconciler.apply(SessionEvent::Feed(FeedEvent::LiveInserted(noise)), now()));
        assert!(reconciler.snapshot(now()).entries.is_empty());
    }

    #[test]
    fn test_tick_flips_liveness_without_heartbeat() {
        let mut reconciler = Reconciler::new(20);
        let beat = now() - Duration::minutes(10);

        assert!(reconciler.apply(SessionEvent::Heartbeat(Some(beat)), now()));
        assert_eq!(reconciler.snapshot(now()).liveness, LivenessStatus::Active);

        // Still inside the window: nothing to publish.
        assert!(!reconciler.apply(SessionEvent::Tick, now() + Duration::minutes(2)));

        let later = now() + Duration::minutes(6);
        assert!(reconciler.apply(SessionEvent::Tick, later));
        assert_eq!(
            reconciler.snapshot(later).liveness,
            LivenessStatus::Inactive {
                label: "16 minutes ago".to_string()
            }
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut reconciler = Reconciler::new(20);
        reconciler.apply(SessionEvent::Heartbeat(Some(now())), now());
        reconciler.apply(
            SessionEvent::Feed(FeedEvent::InitialLoaded(vec![entry("1", 1, "Video")])),
            now(),
        );
        reconciler.apply(SessionEvent::LoadFailed("timeout".to_string()), now());

        assert!(reconciler.apply(SessionEvent::Feed(FeedEvent::Reset), now()));

        let snapshot = reconciler.snapshot(now());
        assert!(snapshot.entries.is_empty());
        assert!(!snapshot.loaded);
        assert_eq!(snapshot.liveness, LivenessStatus::Unknown);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_run_publishes_snapshots() {
        let (tx, rx) = mpsc::channel(8);
        let (snapshots, mut watcher) = watch::channel(DashboardSnapshot::empty(now()));
        let task = tokio::spawn(run(Reconciler::new(20), rx, snapshots));

        tx.send(SessionEvent::Feed(FeedEvent::InitialLoaded(vec![entry("1", 1, "Video")])))
            .await
            .unwrap();
        watcher.changed().await.unwrap();
        assert_eq!(watcher.borrow_and_update().entries.len(), 1);

        drop(tx);
        task.await.unwrap();
    }
}
