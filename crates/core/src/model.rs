//! Denormalized review projection stored in the search replica.
//!
//! The index document mirrors what the primary store's CDC feed emits for
//! one review, flattened for search. Two serialization quirks are load
//! bearing and kept here:
//!
//! - 64-bit business keys travel as decimal strings. JSON numbers lose
//!   precision past 2^53, and the upstream feed already renders them as
//!   strings, so `review_id` and friends round-trip through
//!   [`string_i64`].
//! - Timestamps arrive as `"YYYY-MM-DD HH:MM:SS"` without a zone, which
//!   chrono's RFC 3339 default rejects; [`plain_datetime`] parses that
//!   shape.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One review as indexed in the search replica.
///
/// The document ID is the decimal rendering of `review_id` and never
/// changes once the document exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDoc {
    /// Review business key. Immutable document identity.
    #[serde(with = "string_i64")]
    pub review_id: i64,

    /// Store the review belongs to. Queries filter on this field.
    pub store_id: i64,

    pub user_id: i64,
    pub order_id: i64,

    #[serde(default, with = "string_i64")]
    pub sku_id: i64,

    #[serde(default, with = "string_i64")]
    pub spu_id: i64,

    /// Overall score plus the per-dimension sub-scores.
    pub score: i32,
    #[serde(default)]
    pub service_score: i32,
    #[serde(default)]
    pub express_score: i32,

    #[serde(default)]
    pub content: String,

    /// Review lifecycle status (pending / published / hidden).
    #[serde(default)]
    pub status: i32,

    /// Merchandising tags attached by the reviewer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<ReviewTag>,

    #[serde(default, with = "string_i64")]
    pub create_by: i64,

    #[serde(default, with = "string_i64")]
    pub update_by: i64,

    /// Optimistic-concurrency counter from the primary store.
    #[serde(default, with = "string_i64")]
    pub version: i64,

    #[serde(default, with = "plain_datetime")]
    pub create_at: Option<NaiveDateTime>,

    #[serde(default, with = "plain_datetime")]
    pub update_at: Option<NaiveDateTime>,
}

/// Reviewer-attached tag with its own sub-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewTag {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub score: i32,
}

/// Serialize an `i64` as a decimal string; accept either shape on input.
pub mod string_i64 {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(n),
            Raw::Text(s) => s
                .parse()
                .map_err(|_| de::Error::custom(format!("invalid i64 string: {s:?}"))),
        }
    }
}

/// `"YYYY-MM-DD HH:MM:SS"` timestamps, tolerated as optional.
pub mod plain_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => NaiveDateTime::parse_from_str(&s, FORMAT)
                .map(Some)
                .map_err(|e| de::Error::custom(format!("invalid timestamp {s:?}: {e}"))),
        }
    }
}

impl ReviewDoc {
    /// Document ID in the search replica: `review_id` as a decimal string.
    pub fn doc_id(&self) -> String {
        self.review_id.to_string()
    }
}
