#![forbid(unsafe_code)]

//! Analytics collaborator and the sinks shipped with the walkthrough.
//!
//! [`Analytics::track`] is fire-and-forget: it returns nothing, and every sink
//! here contains its own failures (logged through `tracing`) so that a broken
//! writer or storage never reaches navigation code.
//!
//! | Sink | Use |
//! |------|-----|
//! | [`RecordingAnalytics`] | Shared in-memory log for tests and hosts |
//! | [`TracingAnalytics`] | One structured `tracing` event per call |
//! | [`JsonlAnalytics`] | One JSON object per line on any writer |
//! | [`SessionAnalytics`] | Stamps a per-session id kept in [`SessionStorage`] |

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use serde_json::{Map, Value};

/// Flat property bag attached to an event.
pub type Properties = Map<String, Value>;

/// Session storage key holding the analytics session id.
pub const SESSION_ID_KEY: &str = "stu.analytics.session_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    WalkthroughViewed,
    WalkthroughStepViewed,
    WalkthroughStepNextClicked,
    WalkthroughStepBackClicked,
    WalkthroughCompleted,
    WalkthroughExitCtaClicked,
}

impl EventName {
    pub const ALL: &'static [EventName] = &[
        EventName::WalkthroughViewed,
        EventName::WalkthroughStepViewed,
        EventName::WalkthroughStepNextClicked,
        EventName::WalkthroughStepBackClicked,
        EventName::WalkthroughCompleted,
        EventName::WalkthroughExitCtaClicked,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WalkthroughViewed => "walkthrough_viewed",
            Self::WalkthroughStepViewed => "walkthrough_step_viewed",
            Self::WalkthroughStepNextClicked => "walkthrough_step_next_clicked",
            Self::WalkthroughStepBackClicked => "walkthrough_step_back_clicked",
            Self::WalkthroughCompleted => "walkthrough_completed",
            Self::WalkthroughExitCtaClicked => "walkthrough_exit_cta_clicked",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records named events. Implementations must not panic or block.
pub trait Analytics {
    fn track(&self, event: EventName, properties: Properties);
}

impl<A: Analytics + ?Sized> Analytics for &A {
    fn track(&self, event: EventName, properties: Properties) {
        (**self).track(event, properties);
    }
}

impl<A: Analytics + ?Sized> Analytics for Box<A> {
    fn track(&self, event: EventName, properties: Properties) {
        (**self).track(event, properties);
    }
}

impl<A: Analytics + ?Sized> Analytics for Arc<A> {
    fn track(&self, event: EventName, properties: Properties) {
        (**self).track(event, properties);
    }
}

/// Build a property bag from `(key, value)` pairs.
pub fn properties<I, K, V>(pairs: I) -> Properties
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Recording
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedEvent {
    pub event: EventName,
    pub properties: Properties,
}

impl TrackedEvent {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Cloneable in-memory log; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingAnalytics {
    events: Arc<Mutex<Vec<TrackedEvent>>>,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TrackedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, event: EventName) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| e.event == event).count())
            .unwrap_or(0)
    }

    pub fn names(&self) -> Vec<EventName> {
        self.events().into_iter().map(|e| e.event).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl Analytics for RecordingAnalytics {
    fn track(&self, event: EventName, properties: Properties) {
        match self.events.lock() {
            Ok(mut events) => events.push(TrackedEvent { event, properties }),
            Err(_) => tracing::warn!(
                target: "stu.analytics",
                event = event.as_str(),
                "recording buffer poisoned; event dropped"
            ),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracing
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl Analytics for TracingAnalytics {
    fn track(&self, event: EventName, properties: Properties) {
        let payload = Value::Object(properties);
        tracing::info!(
            target: "stu.analytics",
            event = event.as_str(),
            properties = %payload,
            "analytics event"
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JSONL
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonlLine<'a> {
    seq: u64,
    event: EventName,
    #[serde(flatten)]
    properties: &'a Properties,
}

/// Writes `{"seq":N,"event":"...",<properties>}` lines.
///
/// Write and encode errors are logged and the event is dropped.
#[derive(Debug)]
pub struct JsonlAnalytics<W: Write> {
    inner: Mutex<(W, u64)>,
}

impl<W: Write> JsonlAnalytics<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new((writer, 0)),
        }
    }

    pub fn into_inner(self) -> W {
        match self.inner.into_inner() {
            Ok((writer, _)) => writer,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }
}

impl<W: Write> Analytics for JsonlAnalytics<W> {
    fn track(&self, event: EventName, properties: Properties) {
        let Ok(mut guard) = self.inner.lock() else {
            tracing::warn!(target: "stu.analytics", "jsonl writer poisoned; event dropped");
            return;
        };
        let (writer, seq) = &mut *guard;
        let line = JsonlLine {
            seq: *seq,
            event,
            properties: &properties,
        };
        *seq += 1;
        let result = serde_json::to_writer(&mut *writer, &line)
            .map_err(std::io::Error::from)
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush());
        if let Err(err) = result {
            tracing::warn!(
                target: "stu.analytics",
                event = event.as_str(),
                error = %err,
                "failed to write analytics line"
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session storage
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised by a [`SessionStorage`] backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Storage is disabled (private browsing, blocked cookies).
    Unavailable(String),
    /// Storage quota exceeded.
    QuotaExceeded,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "session storage unavailable: {msg}"),
            Self::QuotaExceeded => write!(f, "session storage quota exceeded"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Per-tab key/value storage (browser `sessionStorage`).
pub trait SessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory session storage; can be switched to failing mode for tests.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    data: RwLock<HashMap<String, String>>,
    failure: RwLock<Option<StorageError>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call fail with `err` (`None` restores normal mode).
    pub fn set_failure(&self, err: Option<StorageError>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = err;
        }
    }

    fn check(&self) -> Result<(), StorageError> {
        match self.failure.read() {
            Ok(failure) => failure.clone().map_or(Ok(()), Err),
            Err(_) => Err(StorageError::Unavailable("lock poisoned".into())),
        }
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        let data = self
            .data
            .read()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        let mut data = self
            .data
            .write()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Adds a `session_id` property read from (or created in) session storage.
///
/// When storage fails, an id generated for this sink instance is used
/// instead and the failure is logged; the event is always forwarded.
#[derive(Debug)]
pub struct SessionAnalytics<S, A> {
    storage: S,
    inner: A,
    fallback_id: String,
}

impl<S: SessionStorage, A: Analytics> SessionAnalytics<S, A> {
    pub fn new(storage: S, inner: A) -> Self {
        Self {
            storage,
            inner,
            fallback_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn session_id(&self) -> String {
        match self.storage.get(SESSION_ID_KEY) {
            Ok(Some(id)) => id,
            Ok(None) => {
                let id = uuid::Uuid::new_v4().to_string();
                match self.storage.set(SESSION_ID_KEY, &id) {
                    Ok(()) => id,
                    Err(err) => {
                        tracing::warn!(
                            target: "stu.analytics",
                            error = %err,
                            "failed to persist analytics session id"
                        );
                        self.fallback_id.clone()
                    }
                }
            }
            Err(err) => {
                tracing::warn!(
                    target: "stu.analytics",
                    error = %err,
                    "failed to read analytics session id"
                );
                self.fallback_id.clone()
            }
        }
    }
}

impl<S: SessionStorage, A: Analytics> Analytics for SessionAnalytics<S, A> {
    fn track(&self, event: EventName, mut properties: Properties) {
        properties.insert("session_id".into(), Value::String(self.session_id()));
        self.inner.track(event, properties);
    }
}
