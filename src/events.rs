//! Session-scoped, append-only event stream shared by every subsystem.
//!
//! Events are kept in memory for the lifetime of the session and fanned
//! out to live subscribers over a `tokio::sync::broadcast` channel. The
//! payload is opaque JSON; no wire format is defined here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

/// Capacity of the live-subscriber channel. Slow subscribers that fall
/// further behind observe `RecvError::Lagged`.
const SUBSCRIBER_CAPACITY: usize = 256;

/// Who produced an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// The agent (actions it proposes).
    Agent,
    /// The human driving the session.
    User,
    /// Runtime, controller, or analyzer bookkeeping.
    Environment,
}

/// A single entry of the session log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Event {
    /// Position in the stream, starting at 0.
    pub id: u64,
    /// Owning session.
    pub session_id: String,
    /// Producer of the event.
    pub source: EventSource,
    /// Opaque event body.
    pub payload: serde_json::Value,
    /// Append time.
    pub timestamp: DateTime<Utc>,
}

/// Append-only log for one session.
#[derive(Debug)]
pub struct EventStream {
    session_id: String,
    events: RwLock<Vec<Event>>,
    sender: broadcast::Sender<Event>,
}

impl EventStream {
    /// Create an empty stream for `session_id`.
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            session_id: session_id.into(),
            events: RwLock::new(Vec::new()),
            sender,
        }
    }

    /// Session this stream belongs to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append an event and notify live subscribers.
    pub async fn append(&self, source: EventSource, payload: serde_json::Value) -> Event {
        let mut events = self.events.write().await;
        let event = Event {
            id: events.len() as u64,
            session_id: self.session_id.clone(),
            source,
            payload,
            timestamp: Utc::now(),
        };
        events.push(event.clone());
        // No subscribers is not an error; the event stays in the log.
        let _ = self.sender.send(event.clone());
        event
    }

    /// Subscribe to events appended from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Snapshot of every event appended so far.
    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }

    /// Id of the most recent event.
    pub async fn latest_id(&self) -> Option<u64> {
        self.events.read().await.last().map(|event| event.id)
    }

    /// Number of events appended so far.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Whether nothing has been appended yet.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}
