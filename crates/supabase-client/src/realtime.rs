//! Realtime change feed over Server-Sent Events.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::Stream;
use reqwest_eventsource::retry::ExponentialBackoff;
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource, RequestBuilderExt};
use tracing::{debug, error, info, warn};

use crate::client::SupabaseClient;
use crate::error::SupabaseError;
use crate::types::{ChangeEvent, ChangeKind};

/// Event names the server uses for keep-alives.
const KEEPALIVE_EVENTS: &[&str] = &["heartbeat", "ping", "keepalive"];

/// Configuration for automatic reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of retries (None = infinite).
    pub max_retries: Option<u32>,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier for each retry.
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: None,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    fn retry_policy(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            self.initial_delay,
            self.backoff_multiplier,
            Some(self.max_delay),
            self.max_retries.map(|n| n as usize),
        )
    }
}

/// What to listen for: one mutation kind on one table, optionally filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Table name.
    pub table: String,
    /// Mutation kind.
    pub event: ChangeKind,
    /// Row filter, e.g. `user_id=eq.<id>`.
    pub filter: Option<String>,
}

impl Subscription {
    /// Subscribe to every `event` on `table`.
    pub fn new(table: impl Into<String>, event: ChangeKind) -> Self {
        Self {
            table: table.into(),
            event,
            filter: None,
        }
    }

    /// Only rows where `column` equals `value`.
    pub fn filter_eq(mut self, column: &str, value: &str) -> Self {
        self.filter = Some(format!("{}=eq.{}", column, value));
        self
    }

    /// Whether a delivered change belongs to this subscription.
    pub fn matches(&self, change: &ChangeEvent) -> bool {
        change.table == self.table && change.kind == self.event
    }
}

/// A stream of row changes for one subscription.
///
/// Dropping the stream closes the underlying connection.
pub struct ChangeStream {
    event_source: EventSource,
    subscription: Subscription,
}

impl ChangeStream {
    /// Open a change stream on behalf of a signed-in user.
    pub fn open(
        client: &SupabaseClient,
        subscription: Subscription,
        access_token: &str,
        reconnect_config: ReconnectConfig,
    ) -> Result<Self, SupabaseError> {
        let url = client.config().realtime_url(
            &subscription.table,
            subscription.event.as_str(),
            subscription.filter.as_deref(),
        );
        info!(table = %subscription.table, event = subscription.event.as_str(), "Opening realtime stream");

        // Long-lived connection; must not share the request timeout.
        let sse_client = reqwest::Client::builder()
            .build()
            .map_err(SupabaseError::Http)?;

        let request = client.authed(sse_client.get(&url), access_token);
        let mut event_source = request
            .eventsource()
            .map_err(|e| SupabaseError::Realtime(e.to_string()))?;
        event_source.set_retry_policy(Box::new(reconnect_config.retry_policy()));

        Ok(Self {
            event_source,
            subscription,
        })
    }

    /// The subscription this stream serves.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Close the connection; the stream ends afterwards.
    pub fn close(&mut self) {
        self.event_source.close();
    }
}

impl Stream for ChangeStream {
    type Item = Result<ChangeEvent, SupabaseError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.event_source).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => match event {
                    Event::Open => {
                        debug!(table = %self.subscription.table, "Realtime stream opened");
                        continue;
                    }
                    Event::Message(msg) => {
                        if KEEPALIVE_EVENTS.contains(&msg.event.as_str()) {
                            continue;
                        }

                        match serde_json::from_str::<ChangeEvent>(&msg.data) {
                            Ok(change) if self.subscription.matches(&change) => {
                                return Poll::Ready(Some(Ok(change)));
                            }
                            Ok(change) => {
                                debug!(
                                    table = %change.table,
                                    kind = change.kind.as_str(),
                                    "Ignoring change outside subscription"
                                );
                                continue;
                            }
                            Err(e) => {
                                warn!("Failed to parse realtime payload: {}", e);
                                debug!("Raw data: {}", msg.data);
                                continue;
                            }
                        }
                    }
                },
                Poll::Ready(Some(Err(e))) => {
                    let err = match e {
                        EventSourceError::InvalidStatusCode(status, _) => SupabaseError::Api {
                            status: status.as_u16(),
                            message: "realtime subscription rejected".to_string(),
                        },
                        other => SupabaseError::Realtime(other.to_string()),
                    };
                    error!(table = %self.subscription.table, "Realtime error: {}", err);
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    info!(table = %self.subscription.table, "Realtime stream ended");
                    return Poll::Ready(None);
                }
                Poll::Pending => {
                    return Poll::Pending;
                }
            }
        }
    }
}

/// Open a change stream with default reconnection.
pub fn subscribe(
    client: &SupabaseClient,
    subscription: Subscription,
    access_token: &str,
) -> Result<ChangeStream, SupabaseError> {
    ChangeStream::open(client, subscription, access_token, ReconnectConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_matches() {
        let sub = Subscription::new("blocking_log", ChangeKind::Insert).filter_eq("user_id", "u1");
        assert_eq!(sub.filter.as_deref(), Some("user_id=eq.u1"));

        let insert: ChangeEvent = serde_json::from_str(
            r#"{"type":"INSERT","table":"blocking_log","record":{"id":1}}"#,
        )
        .unwrap();
        let update: ChangeEvent = serde_json::from_str(
            r#"{"type":"UPDATE","table":"rules","record":{"user_id":"u1"}}"#,
        )
        .unwrap();

        assert!(sub.matches(&insert));
        assert!(!sub.matches(&update));
    }
}
