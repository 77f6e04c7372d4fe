//! Scored item record
//!
//! The JSON shape matches the snapshot files and the HTTP responses:
//! `{ "id": "7", "value": 12, "fetchTime": 1700000000000, "name": "..." }`.
//! Anything besides `id`, `value` and `fetchTime` is carried in `payload`
//! and never interpreted by the heap.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    /// Deduplication key, unique within one ranked set
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    /// Heap ordering key (post count, comment count)
    #[serde(rename = "value")]
    pub score: u64,

    /// Arrival stamp in ms, assigned on insert
    #[serde(rename = "fetchTime", default)]
    pub arrival_time: i64,

    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ScoredItem {
    pub fn new(id: impl Into<String>, score: u64) -> Self {
        Self {
            id: id.into(),
            score,
            arrival_time: 0,
            payload: Map::new(),
        }
    }

    /// Attach a payload field, replacing any previous value under `key`.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

/// Normalize an upstream identifier to its string form.
///
/// Upstream APIs hand out ids as JSON strings or numbers; both map to the
/// same dedup key. Any other JSON type is not a usable id.
pub fn normalize_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    normalize_id(&raw)
        .ok_or_else(|| de::Error::custom(format!("expected string or number id, got {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_field_names() {
        let mut item = ScoredItem::new("u1", 4).with_field("name", "Ada");
        item.arrival_time = 1_700_000_000_000;

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            json!({ "id": "u1", "value": 4, "fetchTime": 1_700_000_000_000i64, "name": "Ada" })
        );
    }

    #[test]
    fn test_numeric_id_is_normalized() {
        let item: ScoredItem =
            serde_json::from_value(json!({ "id": 150, "title": "hello", "value": 2, "fetchTime": 5 }))
                .unwrap();
        assert_eq!(item.id, "150");
        assert_eq!(item.field("title"), Some(&json!("hello")));
    }

    #[test]
    fn test_missing_fetch_time_defaults_to_zero() {
        let item: ScoredItem = serde_json::from_value(json!({ "id": "a", "value": 1 })).unwrap();
        assert_eq!(item.arrival_time, 0);
        assert!(item.payload.is_empty());
    }

    #[test]
    fn test_object_id_is_rejected() {
        let result =
            serde_json::from_value::<ScoredItem>(json!({ "id": { "nested": 1 }, "value": 1 }));
        assert!(result.is_err());
    }
}
