use chrono::NaiveDateTime;
use evidence_protocol::EventKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const LEDGER_HEADER: [&str; 3] = ["timestamp", "event", "payload"];

/// One ledger row as stored. `event` stays a raw string so rows written by other tool
/// versions still replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub timestamp: String,
    pub event: String,
    pub payload: String,
}

impl LedgerRecord {
    pub fn new(timestamp: NaiveDateTime, kind: EventKind, payload: &Value) -> Self {
        Self {
            timestamp: format_timestamp(timestamp),
            event: kind.as_str().to_string(),
            payload: encode_payload(payload),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.event)
    }

    #[must_use]
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT).ok()
    }

    pub fn payload_json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.payload)
    }
}

#[must_use]
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Strings are stored verbatim; lists, objects and other scalars as compact JSON.
#[must_use]
pub fn encode_payload(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// A record skipped during replay. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerParseWarning {
    /// 1-based record position (header excluded)
    pub record: usize,
    pub event: Option<String>,
    pub reason: String,
}

impl fmt::Display for LedgerParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.event {
            Some(event) => write!(f, "record {} ({event}): {}", self.record, self.reason),
            None => write!(f, "record {}: {}", self.record, self.reason),
        }
    }
}
