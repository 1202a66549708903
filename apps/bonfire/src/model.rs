//! Rendered-record model: the log entries the UI collaborator consumes, and
//! the store that lets a later confirmation find the record it refers to.

use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key locating the rendered record a later event refers to.
///
/// The wire correlates by string concatenation: `"Us" + id` for our own
/// sends, `author + id` for remote messages. Servers and existing web UIs
/// match on these exact strings, so the format is load-bearing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn local(id: u64) -> Self {
        Self(format!("Us{id}"))
    }

    /// Key for a confirmation, whose id comes back as a raw JSON scalar.
    pub fn local_from_value(id: &Value) -> Self {
        Self(format!("Us{}", scalar_fragment(id)))
    }

    pub fn remote(author: &str, server_id: &Value) -> Self {
        Self(format!("{author}{}", scalar_fragment(server_id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// JSON strings join the key verbatim; other scalars use their JSON form.
fn scalar_fragment(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Message,
    Error,
    Warning,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub key: Option<CorrelationKey>,
    pub kind: RecordKind,
    /// Presentation timestamp, milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub author: Option<String>,
    pub contents: String,
    /// Round-trip display, filled in once the confirmation arrives.
    pub round_trip: Option<String>,
}

impl LogRecord {
    pub fn message(
        key: CorrelationKey,
        timestamp_ms: i64,
        author: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        Self {
            key: Some(key),
            kind: RecordKind::Message,
            timestamp_ms,
            author: Some(author.into()),
            contents: contents.into(),
            round_trip: None,
        }
    }

    /// A diagnostic entry stamped with the current time; carries no key and
    /// no author.
    pub fn notice(kind: RecordKind, contents: impl Into<String>) -> Self {
        Self {
            key: None,
            kind,
            timestamp_ms: now_ms(),
            author: None,
            contents: contents.into(),
            round_trip: None,
        }
    }
}

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Consumer of rendered records; the CLI printer implements this, tests plug
/// in probes. Implementations must not call back into the store.
pub trait RenderSink: Send + Sync {
    /// A new record was appended to the log.
    fn appended(&self, record: &LogRecord);
    /// An existing record gained its round-trip confirmation.
    fn confirmed(&self, record: &LogRecord);
}

/// Append-only record log with an explicit correlation-key index, so a
/// confirmation mutates exactly the record created by the send it confirms.
#[derive(Default)]
pub struct LogStore {
    inner: Mutex<LogStoreInner>,
    sink: Option<Box<dyn RenderSink>>,
}

#[derive(Default)]
struct LogStoreInner {
    records: Vec<LogRecord>,
    by_key: HashMap<CorrelationKey, usize>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: Box<dyn RenderSink>) -> Self {
        Self {
            inner: Mutex::new(LogStoreInner::default()),
            sink: Some(sink),
        }
    }

    /// Appends a record, indexing it by correlation key when it has one, and
    /// returns its position.
    pub fn append(&self, record: LogRecord) -> usize {
        let mut inner = self.inner.lock();
        let index = inner.records.len();
        if let Some(key) = record.key.clone() {
            inner.by_key.insert(key, index);
        }
        inner.records.push(record);
        if let Some(sink) = &self.sink {
            sink.appended(&inner.records[index]);
        }
        index
    }

    /// Fills in the round-trip display of the record the key refers to.
    /// Returns false when no record matches.
    pub fn set_round_trip(&self, key: &CorrelationKey, display: &str) -> bool {
        let mut inner = self.inner.lock();
        let Some(&index) = inner.by_key.get(key) else {
            return false;
        };
        inner.records[index].round_trip = Some(display.to_string());
        if let Some(sink) = &self.sink {
            sink.confirmed(&inner.records[index]);
        }
        true
    }

    /// Snapshot of the rendered log, in append order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.inner.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
