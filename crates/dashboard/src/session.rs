//! Signed-in sessions and their background tasks.
//!
//! Each browser holds at most one dashboard session, found through a key
//! stored in its cookie session record. Establishing a session spawns its
//! reconciler and the producers feeding it; tearing it down aborts all of
//! them. Each session gets a generation number so that work started under
//! an older session can tell it has been superseded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use policy::{BlockingLogEntry, FeedEvent};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use store::{blocking_log, rules, Store};
use supabase_client::{
    AuthEvent, ChangeKind, ChangeStream, ReconnectConfig, Session, Subscription,
};
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_sessions::cookie::{time, SameSite};
use tower_sessions::{Expiry, MemoryStore, Session as CookieSession, SessionManagerLayer};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::DashboardError;
use crate::reconciler::{self, DashboardSnapshot, Reconciler, SessionEvent};
use crate::state::AppState;

const INBOX_CAPACITY: usize = 256;
const AUTH_EVENT_CAPACITY: usize = 16;

/// Tokens closer than this to expiry are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 60;

const COOKIE_NAME: &str = "dashboard.sid";
const SESSION_KEY_FIELD: &str = "dashboard.session";
const SESSION_KEY_LEN: usize = 32;

/// Cookie session layer binding browsers to dashboard sessions.
pub fn cookie_layer(config: &Config) -> SessionManagerLayer<MemoryStore> {
    let idle = time::Duration::seconds(config.session_idle.as_secs() as i64);
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(COOKIE_NAME)
        .with_secure(config.secure_cookies())
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(idle))
}

/// Server-side name of one browser's dashboard session. Kept in the cookie
/// session record, never sent to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    fn generate() -> Self {
        let key = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_KEY_LEN)
            .map(char::from)
            .collect();
        Self(key)
    }
}

/// Tunables for per-session tasks.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Size of the initial recent-activity batch.
    pub recent_activity_limit: usize,
    /// Liveness re-evaluation period.
    pub liveness_tick: Duration,
}

/// The requesting browser's session as seen by a handler.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub key: SessionKey,
    pub session: Session,
    pub generation: u64,
}

impl SessionContext {
    pub fn user_id(&self) -> &str {
        self.session.user_id()
    }
}

struct ActiveSession {
    context: SessionContext,
    snapshots: watch::Receiver<DashboardSnapshot>,
    inbox: mpsc::Sender<SessionEvent>,
    /// Reconciler, initial load and ticker.
    tasks: Vec<JoinHandle<()>>,
    /// Change forwarders; restarted when the access token changes.
    streams: Vec<JoinHandle<()>>,
    /// Unix seconds of the last request that used the session.
    last_active: AtomicI64,
}

impl ActiveSession {
    fn touch(&self) {
        self.last_active.store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    fn abort(self) {
        for task in self.tasks.into_iter().chain(self.streams) {
            task.abort();
        }
    }
}

/// Owner of every signed-in session.
#[derive(Clone)]
pub struct SessionManager {
    store: Store,
    settings: SessionSettings,
    active: Arc<RwLock<HashMap<SessionKey, ActiveSession>>>,
    generation: Arc<AtomicU64>,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("settings", &self.settings)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

impl SessionManager {
    pub fn new(store: Store, settings: SessionSettings) -> Self {
        let (auth_events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            store,
            settings,
            active: Arc::new(RwLock::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
            auth_events,
        }
    }

    /// Receive auth state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }

    /// Bind `session` to the requesting browser and start it. The cookie
    /// gets a fresh id on every sign-in.
    pub async fn sign_in(
        &self,
        cookie: &CookieSession,
        session: Session,
        event: AuthEvent,
    ) -> Result<SessionContext, DashboardError> {
        let key = match cookie.get::<SessionKey>(SESSION_KEY_FIELD).await? {
            Some(key) => key,
            None => SessionKey::generate(),
        };
        cookie.cycle_id().await?;
        cookie.insert(SESSION_KEY_FIELD, &key).await?;

        Ok(self.establish(key, session, Some(event)).await)
    }

    /// End the requesting browser's session and drop its cookie record.
    pub async fn sign_out(
        &self,
        cookie: &CookieSession,
    ) -> Result<Option<SessionContext>, DashboardError> {
        let key = cookie.remove::<SessionKey>(SESSION_KEY_FIELD).await?;
        cookie.flush().await?;

        match key {
            Some(key) => Ok(self.teardown(&key).await),
            None => Ok(None),
        }
    }

    /// Make `session` the session under `key`, disposing of whatever held
    /// that key first, and announce `event`.
    pub async fn establish(
        &self,
        key: SessionKey,
        session: Session,
        event: Option<AuthEvent>,
    ) -> SessionContext {
        let mut active = self.active.write().await;

        if let Some(previous) = active.remove(&key) {
            let previous_user = previous.context.user_id().to_string();
            previous.abort();
            if previous_user != session.user_id() {
                info!(user_id = %previous_user, "Previous session disposed");
                self.publish(AuthEvent::SignedOut {
                    user_id: previous_user,
                });
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let context = SessionContext {
            key: key.clone(),
            session,
            generation,
        };
        let (snapshots, inbox, tasks) = self.spawn_tasks(&context);
        let streams = self.spawn_streams(&context.session, &inbox);
        active.insert(
            key,
            ActiveSession {
                context: context.clone(),
                snapshots,
                inbox,
                tasks,
                streams,
                last_active: AtomicI64::new(Utc::now().timestamp()),
            },
        );
        drop(active);

        info!(user_id = %context.user_id(), generation, "Session established");
        if let Some(event) = event {
            self.publish(event);
        }
        context
    }

    /// End the session under `key`, aborting its tasks.
    pub async fn teardown(&self, key: &SessionKey) -> Option<SessionContext> {
        let previous = self.active.write().await.remove(key)?;
        let context = previous.context.clone();
        previous.abort();

        info!(user_id = %context.user_id(), generation = context.generation, "Session ended");
        self.publish(AuthEvent::SignedOut {
            user_id: context.user_id().to_string(),
        });
        Some(context)
    }

    /// The session under `key`, if any.
    pub async fn current(&self, key: &SessionKey) -> Option<SessionContext> {
        let active = self.active.read().await;
        let entry = active.get(key)?;
        entry.touch();
        Some(entry.context.clone())
    }

    /// Whether the browser behind `context` is still signed in as the same
    /// user. Token refreshes keep a context current.
    pub async fn is_current(&self, context: &SessionContext) -> bool {
        self.active
            .read()
            .await
            .get(&context.key)
            .is_some_and(|entry| entry.context.user_id() == context.user_id())
    }

    /// Snapshot channel of the session under `key`.
    pub async fn snapshots(
        &self,
        key: &SessionKey,
    ) -> Option<watch::Receiver<DashboardSnapshot>> {
        self.active
            .read()
            .await
            .get(key)
            .map(|entry| entry.snapshots.clone())
    }

    /// Number of signed-in sessions.
    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }

    /// Announce a user update on a session.
    pub fn user_updated(&self, context: &SessionContext) {
        self.publish(AuthEvent::UserUpdated {
            user_id: context.user_id().to_string(),
        });
    }

    /// Swap in fresh tokens when the context's access token is about to
    /// expire. Only the change streams restart; the reconciler and its
    /// snapshot subscribers carry on. A rejected refresh token ends the
    /// session.
    pub async fn refresh_if_expiring(
        &self,
        context: SessionContext,
    ) -> Result<SessionContext, DashboardError> {
        if !expires_soon(&context.session, Utc::now()) {
            return Ok(context);
        }

        debug!(user_id = %context.user_id(), "Refreshing access token");
        let result = self
            .store
            .client()
            .refresh_session(context.session.refresh_token())
            .await;

        let mut active = self.active.write().await;
        let Some(entry) = active.get_mut(&context.key) else {
            return Err(DashboardError::SessionChanged);
        };
        // Another request may have refreshed or replaced the session meanwhile.
        if entry.context.generation != context.generation
            || entry.context.session.access_token() != context.session.access_token()
        {
            return Ok(entry.context.clone());
        }

        let refreshed = match result {
            Ok(session) => session,
            Err(err) if err.is_unauthorized() => {
                drop(active);
                warn!(user_id = %context.user_id(), "Refresh token rejected, signing out");
                self.teardown(&context.key).await;
                return Err(DashboardError::Unauthenticated);
            }
            Err(err) => return Err(err.into()),
        };

        for stream in entry.streams.drain(..) {
            stream.abort();
        }
        entry.streams = self.spawn_streams(&refreshed, &entry.inbox);
        entry.context.session = refreshed;

        info!(
            user_id = %context.user_id(),
            generation = context.generation,
            "Access token refreshed"
        );
        Ok(entry.context.clone())
    }

    /// Drop sessions no request has used for `max_idle`. Returns how many
    /// were dropped.
    pub async fn expire_idle(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now().timestamp() - max_idle.as_secs() as i64;
        let mut active = self.active.write().await;
        let idle: Vec<SessionKey> = active
            .iter()
            .filter(|(_, entry)| entry.last_active.load(Ordering::Relaxed) < cutoff)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &idle {
            if let Some(entry) = active.remove(key) {
                let user_id = entry.context.user_id().to_string();
                entry.abort();
                info!(user_id = %user_id, "Idle session expired");
                self.publish(AuthEvent::SignedOut { user_id });
            }
        }
        idle.len()
    }

    fn publish(&self, event: AuthEvent) {
        debug!(?event, "Auth event");
        // No receivers is fine.
        let _ = self.auth_events.send(event);
    }

    fn spawn_tasks(
        &self,
        context: &SessionContext,
    ) -> (
        watch::Receiver<DashboardSnapshot>,
        mpsc::Sender<SessionEvent>,
        Vec<JoinHandle<()>>,
    ) {
        let (inbox, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(DashboardSnapshot::empty(Utc::now()));
        let reconciler = Reconciler::new(self.settings.recent_activity_limit);

        let tasks = vec![
            tokio::spawn(reconciler::run(reconciler, inbox_rx, snapshot_tx)),
            tokio::spawn(initial_load(
                self.store.clone(),
                context.session.clone(),
                self.settings.recent_activity_limit,
                inbox.clone(),
            )),
            tokio::spawn(liveness_ticker(self.settings.liveness_tick, inbox.clone())),
        ];

        (snapshot_rx, inbox, tasks)
    }

    fn spawn_streams(
        &self,
        session: &Session,
        inbox: &mpsc::Sender<SessionEvent>,
    ) -> Vec<JoinHandle<()>> {
        let log_inserts = Subscription::new(blocking_log::BLOCKING_LOG_TABLE, ChangeKind::Insert)
            .filter_eq("user_id", session.user_id());
        let rules_updates = Subscription::new(rules::RULES_TABLE, ChangeKind::Update)
            .filter_eq("user_id", session.user_id());

        vec![
            tokio::spawn(forward_changes(
                self.store.clone(),
                session.clone(),
                log_inserts,
                inbox.clone(),
                |entry: BlockingLogEntry| SessionEvent::Feed(FeedEvent::LiveInserted(entry)),
            )),
            tokio::spawn(forward_changes(
                self.store.clone(),
                session.clone(),
                rules_updates,
                inbox.clone(),
                |row: HeartbeatRow| SessionEvent::Heartbeat(row.last_seen),
            )),
        ]
    }
}

/// The part of a rules row the dashboard watches.
#[derive(Debug, Deserialize)]
struct HeartbeatRow {
    #[serde(default)]
    last_seen: Option<DateTime<Utc>>,
}

fn expires_soon(session: &Session, now: DateTime<Utc>) -> bool {
    session
        .expires_at
        .is_some_and(|expires_at| expires_at - now.timestamp() <= REFRESH_MARGIN_SECS)
}

/// Fetch the heartbeat and the most recent entries once.
async fn initial_load(
    store: Store,
    session: Session,
    limit: usize,
    inbox: mpsc::Sender<SessionEvent>,
) {
    let client = store.client();
    let (policy, entries) = tokio::join!(
        rules::load_policy(client, &session),
        blocking_log::recent_entries(client, &session, limit),
    );

    let heartbeat = match policy {
        Ok(policy) => SessionEvent::Heartbeat(policy.last_seen),
        Err(err) => {
            warn!(user_id = %session.user_id(), "Failed to load rules: {}", err);
            SessionEvent::LoadFailed(format!("Could not load your settings: {}", err))
        }
    };
    let feed = match entries {
        Ok(entries) => SessionEvent::Feed(FeedEvent::InitialLoaded(entries)),
        Err(err) => {
            warn!(user_id = %session.user_id(), "Failed to load recent activity: {}", err);
            SessionEvent::LoadFailed(format!("Could not load recent activity: {}", err))
        }
    };

    for event in [heartbeat, feed] {
        if inbox.send(event).await.is_err() {
            return;
        }
    }
}

/// Decode each change on `subscription` and hand it to the reconciler.
async fn forward_changes<T, F>(
    store: Store,
    session: Session,
    subscription: Subscription,
    inbox: mpsc::Sender<SessionEvent>,
    to_event: F,
) where
    T: DeserializeOwned,
    F: Fn(T) -> SessionEvent,
{
    let table = subscription.table.clone();
    let mut changes = match ChangeStream::open(
        store.client(),
        subscription,
        session.access_token(),
        ReconnectConfig::default(),
    ) {
        Ok(changes) => changes,
        Err(err) => {
            warn!(table = %table, "Could not subscribe to changes: {}", err);
            let _ = inbox
                .send(SessionEvent::LoadFailed(format!(
                    "Live updates are unavailable: {}",
                    err
                )))
                .await;
            return;
        }
    };

    while let Some(result) = changes.next().await {
        let change = match result {
            Ok(change) => change,
            // The stream reconnects on its own.
            Err(err) => {
                warn!(table = %table, "Change feed error: {}", err);
                continue;
            }
        };

        match change.record::<T>() {
            Ok(record) => {
                if inbox.send(to_event(record)).await.is_err() {
                    break;
                }
            }
            Err(err) => warn!(table = %table, "Ignoring malformed change: {}", err),
        }
    }

    debug!(table = %table, "Change forwarder stopped");
}

/// Re-evaluate liveness on a fixed period even when no heartbeat arrives.
async fn liveness_ticker(period: Duration, inbox: mpsc::Sender<SessionEvent>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if inbox.send(SessionEvent::Tick).await.is_err() {
            break;
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionContext {
    type Rejection = DashboardError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookie = CookieSession::from_request_parts(parts, state)
            .await
            .map_err(|(_, reason)| {
                warn!(reason, "Cookie session unavailable");
                DashboardError::Unauthenticated
            })?;
        let key = cookie
            .get::<SessionKey>(SESSION_KEY_FIELD)
            .await?
            .ok_or(DashboardError::Unauthenticated)?;
        let context = state
            .sessions
            .current(&key)
            .await
            .ok_or(DashboardError::Unauthenticated)?;
        state.sessions.refresh_if_expiring(context).await
    }
}
