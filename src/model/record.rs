//! Objects decoded from a search response.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::UnknownFields;

/// Discriminant of a streamed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordKind {
    /// Leading marker object, sent once at the start of a stream.
    Pioneer,
    /// A matching record.
    Result,
    /// Anything else the server emits (scan position reports and the like).
    Other(String),
}

impl Default for RecordKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for RecordKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pioneer" => Self::Pioneer,
            "result" => Self::Result,
            _ => Self::Other(value),
        }
    }
}

impl From<RecordKind> for String {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Pioneer => "pioneer".to_string(),
            RecordKind::Result => "result".to_string(),
            RecordKind::Other(other) => other,
        }
    }
}

/// One object from a streaming search body.
///
/// The payload (key, value, headers and whatever the value deserializer
/// produced) is opaque to the client and kept in server order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Object type.
    #[serde(rename = "type", default)]
    pub kind: RecordKind,
    /// Partition the record was read from.
    #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "Option::is_none")]
    pub partition: Option<i32>,
    /// Offset within the partition.
    #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// Record timestamp, epoch milliseconds.
    #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Remaining fields.
    #[serde(flatten)]
    pub payload: UnknownFields,
}

/// Integer position field; a value of the wrong type reads as absent.
fn lenient_int<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64> + std::str::FromStr,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|n| T::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl ResultRecord {
    /// Whether this object is a match to render.
    #[must_use]
    pub fn is_result(&self) -> bool {
        self.kind == RecordKind::Result
    }

    /// Scan position carried by this object, if any.
    #[must_use]
    pub fn progress(&self, count: usize) -> Option<Progress> {
        if self.partition.is_none() && self.offset.is_none() && self.timestamp.is_none() {
            return None;
        }

        Some(Progress {
            partition: self.partition,
            offset: self.offset,
            timestamp: self.timestamp,
            count,
        })
    }

    /// Payload field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }
}

/// Live scan position and number of results so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    /// Partition last reported.
    pub partition: Option<i32>,
    /// Offset last reported.
    pub offset: Option<i64>,
    /// Timestamp last reported, epoch milliseconds.
    pub timestamp: Option<i64>,
    /// Number of results received in this session.
    pub count: usize,
}

impl Progress {
    /// Reported timestamp as a UTC date.
    #[must_use]
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

/// An error body reported by the server, or a transport failure shaped like one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// The `error` value.
    pub error: Value,
    /// Any other fields the server included.
    #[serde(flatten)]
    pub extra: UnknownFields,
}

impl ServerError {
    /// Wrap a plain message.
    #[must_use]
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            error: Value::String(message.into()),
            extra: UnknownFields::new(),
        }
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_record_decode() {
        let json = r#"{"type":"result","partition":1,"offset":6,"timestamp":101,"key":"k","value":{"a":[1,2]}}"#;
        let record: ResultRecord = serde_json::from_str(json).unwrap();

        assert!(record.is_result());
        assert_eq!(record.partition, Some(1));
        assert_eq!(record.field("key"), Some(&Value::String("k".into())));

        let keys: Vec<_> = record.payload.keys().collect();
        assert_eq!(keys, vec!["key", "value"]);
    }

    #[test]
    fn test_kinds() {
        let pioneer: ResultRecord = serde_json::from_str(r#"{"type":"pioneer"}"#).unwrap();
        assert_eq!(pioneer.kind, RecordKind::Pioneer);
        assert!(pioneer.progress(0).is_none());

        let other: ResultRecord =
            serde_json::from_str(r#"{"type":"offset","partition":2,"offset":10000}"#).unwrap();
        assert_eq!(other.kind, RecordKind::Other("offset".into()));
        assert_eq!(other.progress(3).unwrap().count, 3);

        let untyped: ResultRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(untyped.kind, RecordKind::Other(String::new()));
    }

    #[test]
    fn test_wrongly_typed_positions_read_as_absent() {
        let json = r#"{"type":"result","partition":"1","offset":"x","timestamp":1.5,"value":"v"}"#;
        let record: ResultRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.partition, Some(1));
        assert_eq!(record.offset, None);
        assert_eq!(record.timestamp, None);
        assert_eq!(record.field("value"), Some(&Value::String("v".into())));

        let out_of_range: ResultRecord =
            serde_json::from_str(r#"{"partition":4294967296,"offset":null,"timestamp":[1]}"#).unwrap();
        assert_eq!(out_of_range.partition, None);
        assert!(out_of_range.progress(0).is_none());
    }

    #[test]
    fn test_kind_serializes_as_string() {
        let record: ResultRecord = serde_json::from_str(r#"{"type":"result","offset":5}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"type":"result","offset":5}"#
        );
    }

    #[test]
    fn test_progress_timestamp() {
        let progress = Progress {
            timestamp: Some(1_500_000_000_000),
            ..Progress::default()
        };
        assert_eq!(
            progress.timestamp_utc().unwrap().to_rfc3339(),
            "2017-07-14T02:40:00+00:00"
        );
    }

    #[test]
    fn test_server_error_message() {
        let err: ServerError = serde_json::from_str(r#"{"error":"topic not found"}"#).unwrap();
        assert_eq!(err.message(), "topic not found");

        let nested: ServerError = serde_json::from_str(r#"{"error":{"code":4}}"#).unwrap();
        assert_eq!(nested.message(), r#"{"code":4}"#);
    }
}
