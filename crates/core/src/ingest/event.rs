//! Row-change event envelope and decode.
//!
//! The feed emits one JSON envelope per primary-store transaction batch:
//! an operation type, source table metadata, and the changed rows as flat
//! field maps. Only `"INSERT"` is special; every other type (UPDATE and
//! anything the feed invents later) takes the partial-update route. No
//! type signals deletion.

use crate::Error;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Wire envelope as consumed from the change log.
#[derive(Debug, Clone, Deserialize)]
pub struct RawChangeMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub isddl: bool,
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
}

/// Operation routing for one event. All rows in an event share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpKind {
    Insert,
    /// Any non-insert type, kept verbatim for logging.
    Other(String),
}

/// Decoded change event ready for the index writer.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub op: OpKind,
    pub table: String,
    pub rows: Vec<Map<String, Value>>,
}

impl RawChangeMessage {
    /// Decode a raw log payload.
    pub fn decode(payload: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(payload).map_err(|e| Error::Decode(e.to_string()))
    }

    pub fn into_event(self) -> ChangeEvent {
        let op = if self.kind == "INSERT" { OpKind::Insert } else { OpKind::Other(self.kind) };
        ChangeEvent { op, table: self.table, rows: self.data }
    }
}

impl ChangeEvent {
    /// Document ID for one row: its `review_id`, rendered as a decimal
    /// string. The feed usually sends it as a string already, but numeric
    /// form shows up too depending on the producer's JSON settings.
    pub fn doc_id(row: &Map<String, Value>) -> Result<String, Error> {
        match row.get("review_id") {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(other) => Err(Error::Decode(format!("review_id has unusable type: {other}"))),
            None => Err(Error::Decode("row is missing review_id".into())),
        }
    }
}
