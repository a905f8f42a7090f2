//! Cache entry record and the tagged payload envelope.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope recording the shape of a stored result.
///
/// Results are persisted as JSON, which cannot tell a tuple from a list or a
/// set from either. The discriminant keeps that identity across storage so
/// non-list results survive a round trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum CachedPayload {
    List(Vec<Value>),
    Map(serde_json::Map<String, Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    Scalar(Value),
    Absent,
}

impl CachedPayload {
    /// Wrap a plain JSON result in the envelope.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => CachedPayload::Absent,
            Value::Array(items) => CachedPayload::List(items),
            Value::Object(map) => CachedPayload::Map(map),
            other => CachedPayload::Scalar(other),
        }
    }

    /// Unwrap back into plain JSON. Tuples and sets come back as sequences.
    pub fn into_json(self) -> Value {
        match self {
            CachedPayload::List(items)
            | CachedPayload::Tuple(items)
            | CachedPayload::Set(items) => Value::Array(items),
            CachedPayload::Map(map) => Value::Object(map),
            CachedPayload::Scalar(value) => value,
            CachedPayload::Absent => Value::Null,
        }
    }
}

/// A TTL-governed store record. Created on first fetch for a key and
/// overwritten whole on every re-fetch, never partially updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: CachedPayload,
    pub cached_at: DateTime<Utc>,
    pub ttl_hours: f64,
}

impl CacheEntry {
    pub fn new(key: &str, payload: CachedPayload, ttl_hours: f64) -> Self {
        Self {
            key: key.to_string(),
            payload,
            cached_at: Utc::now(),
            ttl_hours,
        }
    }

    /// Validity is `now < cached_at + ttl_hours`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let ttl_ms = (self.ttl_hours * 3_600_000.0) as i64;
        now < self.cached_at + Duration::milliseconds(ttl_ms)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}
