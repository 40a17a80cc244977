//! Query parameters and the shareable link codec.
//!
//! A [`QueryState`] is built once per submission and never mutated after a
//! session starts. Its shareable form is the JSON object the browser client
//! kept in the page location, percent-encoded so it can be pasted as a URL
//! query component:
//!
//! ```rust
//! use kbrowse_client::model::QueryState;
//!
//! let query = QueryState::new("localhost:9092", "orders").with_key("user-42");
//! let link = query.encode();
//! assert_eq!(QueryState::decode(&link)?, query);
//! # Ok::<(), kbrowse_client::KbrowseError>(())
//! ```

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{KbrowseError, Result};

/// Characters left readable in an encoded link.
const LINK_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b':')
    .remove(b',')
    .remove(b'/');

/// Parameters of a single search submission.
///
/// Optional text fields are never `Some("")`: the builders and the decoder
/// normalize empty strings to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState {
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    val_regex: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    bootstrap_servers: String,
    #[serde(default, deserialize_with = "de_text")]
    topic: String,
    #[serde(default, deserialize_with = "de_offset", skip_serializing_if = "Option::is_none")]
    relative_offset: Option<i64>,
    #[serde(default, deserialize_with = "de_flag")]
    follow: bool,
    #[serde(default, deserialize_with = "de_flag")]
    default_partition: bool,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    value_deserializer: Option<String>,
    #[serde(
        rename = "schemaRegistryURL",
        default,
        deserialize_with = "de_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    schema_registry_url: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    partitions: Option<String>,
}

impl QueryState {
    /// Create a query against one topic on one cluster.
    #[must_use]
    pub fn new(bootstrap_servers: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Set the key regex.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = non_empty(key.into());
        self
    }

    /// Set the value regex.
    #[must_use]
    pub fn with_val_regex(mut self, val_regex: impl Into<String>) -> Self {
        self.val_regex = non_empty(val_regex.into());
        self
    }

    /// Set the bootstrap servers.
    #[must_use]
    pub fn with_bootstrap_servers(mut self, servers: impl Into<String>) -> Self {
        self.bootstrap_servers = servers.into();
        self
    }

    /// Set the topic.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set the relative offset.
    #[must_use]
    pub fn with_relative_offset(mut self, offset: Option<i64>) -> Self {
        self.relative_offset = offset;
        self
    }

    /// Keep the search open and follow new records.
    #[must_use]
    pub fn with_follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    /// Let the server pick the partition from the key.
    #[must_use]
    pub fn with_default_partition(mut self, default_partition: bool) -> Self {
        self.default_partition = default_partition;
        self
    }

    /// Set the value deserializer.
    #[must_use]
    pub fn with_value_deserializer(mut self, name: impl Into<String>) -> Self {
        self.value_deserializer = non_empty(name.into());
        self
    }

    /// Set the schema registry URL.
    #[must_use]
    pub fn with_schema_registry_url(mut self, url: impl Into<String>) -> Self {
        self.schema_registry_url = non_empty(url.into());
        self
    }

    /// Set the comma separated partition list.
    #[must_use]
    pub fn with_partitions(mut self, partitions: impl Into<String>) -> Self {
        self.partitions = non_empty(partitions.into());
        self
    }

    /// Key regex.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Value regex as typed by the user (unwrapped).
    #[must_use]
    pub fn val_regex(&self) -> Option<&str> {
        self.val_regex.as_deref()
    }

    /// Bootstrap servers of the cluster to search.
    #[must_use]
    pub fn bootstrap_servers(&self) -> &str {
        &self.bootstrap_servers
    }

    /// Topic to search.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Relative offset: non-negative from earliest, negative from latest.
    #[must_use]
    pub const fn relative_offset(&self) -> Option<i64> {
        self.relative_offset
    }

    /// Whether the search follows the topic.
    #[must_use]
    pub const fn follow(&self) -> bool {
        self.follow
    }

    /// Whether the server resolves the partition from the key.
    #[must_use]
    pub const fn default_partition(&self) -> bool {
        self.default_partition
    }

    /// Value deserializer name.
    #[must_use]
    pub fn value_deserializer(&self) -> Option<&str> {
        self.value_deserializer.as_deref()
    }

    /// Schema registry URL.
    #[must_use]
    pub fn schema_registry_url(&self) -> Option<&str> {
        self.schema_registry_url.as_deref()
    }

    /// Comma separated partition list.
    #[must_use]
    pub fn partitions(&self) -> Option<&str> {
        self.partitions.as_deref()
    }

    /// Partition list split into trimmed, non-empty items.
    #[must_use]
    pub fn partition_list(&self) -> Vec<&str> {
        self.partitions
            .as_deref()
            .map(|csv| csv.split(',').map(str::trim).filter(|p| !p.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Overlay every field that `other` sets onto this query.
    ///
    /// Used to apply explicit command-line flags on top of a shared link.
    /// Booleans are unset when false, so `follow` and `default_partition`
    /// can only be switched on here.
    #[must_use]
    pub fn overlay(mut self, other: &QueryState) -> Self {
        if other.key.is_some() {
            self.key = other.key.clone();
        }
        if other.val_regex.is_some() {
            self.val_regex = other.val_regex.clone();
        }
        if !other.bootstrap_servers.is_empty() {
            self.bootstrap_servers = other.bootstrap_servers.clone();
        }
        if !other.topic.is_empty() {
            self.topic = other.topic.clone();
        }
        if other.relative_offset.is_some() {
            self.relative_offset = other.relative_offset;
        }
        self.follow |= other.follow;
        self.default_partition |= other.default_partition;
        if other.value_deserializer.is_some() {
            self.value_deserializer = other.value_deserializer.clone();
        }
        if other.schema_registry_url.is_some() {
            self.schema_registry_url = other.schema_registry_url.clone();
        }
        if other.partitions.is_some() {
            self.partitions = other.partitions.clone();
        }
        self
    }

    /// Encode into a shareable URL query component.
    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing plain strings, integers and booleans cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        utf8_percent_encode(&json, LINK_COMPONENT).to_string()
    }

    /// Decode a shared link.
    ///
    /// Accepts the bare component produced by [`encode`](Self::encode), the
    /// component with a leading `?`, or a whole URL. Missing fields take
    /// their defaults and unknown fields are ignored.
    pub fn decode(link: &str) -> Result<Self> {
        let component = link_component(link.trim());
        if component.is_empty() {
            return Err(KbrowseError::invalid_link("no query component"));
        }

        let json = percent_decode_str(component)
            .decode_utf8()
            .map_err(|e| KbrowseError::invalid_link(format!("not UTF-8 after decoding: {e}")))?;

        serde_json::from_str(&json).map_err(|e| KbrowseError::invalid_link(e.to_string()))
    }
}

/// Locate the encoded JSON inside whatever the user pasted.
fn link_component(link: &str) -> &str {
    let starts_json = link.starts_with('{')
        || link
            .get(..3)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("%7B"));

    let component = if starts_json {
        link
    } else {
        link.split_once('?').map_or(link, |(_, query)| query)
    };

    component.split_once('#').map_or(component, |(query, _)| query)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn de_opt_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.and_then(non_empty))
}

fn de_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Shapes the browser client wrote for scalar form inputs.
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn de_offset<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Loose>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Int(n)) => Ok(Some(n)),
        Some(Loose::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Loose::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("relativeOffset is not an integer: {s:?}"))),
        Some(Loose::Bool(b)) => Err(D::Error::custom(format!(
            "relativeOffset is not an integer: {b}"
        ))),
    }
}

fn de_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        None => false,
        Some(Loose::Bool(b)) => b,
        Some(Loose::Int(n)) => n != 0,
        Some(Loose::Text(s)) => s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("on"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn full_query() -> QueryState {
        QueryState::new("kafka-1:9092,kafka-2:9092", "orders")
            .with_key("user-[0-9]+")
            .with_val_regex("shipped & paid")
            .with_relative_offset(Some(-500))
            .with_follow(true)
            .with_value_deserializer("avro")
            .with_schema_registry_url("http://registry:8081")
            .with_partitions("0,3, 7")
    }

    #[test]
    fn test_roundtrip_all_fields() {
        let query = full_query();
        assert_eq!(QueryState::decode(&query.encode()).unwrap(), query);
    }

    #[test]
    fn test_roundtrip_minimal() {
        let query = QueryState::new("localhost:9092", "t");
        assert_eq!(QueryState::decode(&query.encode()).unwrap(), query);
    }

    #[test]
    fn test_empty_strings_normalize_to_none() {
        let query = QueryState::new("s", "t").with_key("").with_partitions("");
        assert_eq!(query.key(), None);
        assert_eq!(query.partitions(), None);
    }

    #[test]
    fn test_decode_browser_link() {
        // The browser stored every input as a string, including empty ones.
        let raw = r#"{"key":"k","valRegex":"","bootstrapServers":"localhost:9092","topic":"kbrowse","relativeOffset":"-10","follow":false,"defaultPartition":true,"valueDeserializer":"","schemaRegistryURL":"","partitions":""}"#;
        let encoded = format!("http://localhost:4000/?{}", utf8_percent_encode(raw, NON_ALPHANUMERIC));

        let query = QueryState::decode(&encoded).unwrap();
        assert_eq!(query.key(), Some("k"));
        assert_eq!(query.val_regex(), None);
        assert_eq!(query.relative_offset(), Some(-10));
        assert!(query.default_partition());
        assert_eq!(query.topic(), "kbrowse");
    }

    #[test]
    fn test_decode_tolerates_missing_and_unknown_fields() {
        let query = QueryState::decode(r#"?{"topic":"t","theme":"dark"}"#).unwrap();
        assert_eq!(query, QueryState::new("", "t"));
    }

    #[test]
    fn test_decode_raw_json_with_question_mark_in_regex() {
        let query = QueryState::decode(r#"{"topic":"t","key":"colou?r"}"#).unwrap();
        assert_eq!(query.key(), Some("colou?r"));
    }

    #[test]
    fn test_decode_rejects_bad_offset() {
        let err = QueryState::decode(r#"{"relativeOffset":"soon"}"#).unwrap_err();
        assert!(matches!(err, KbrowseError::InvalidLink { .. }));
    }

    #[test]
    fn test_decode_rejects_empty() {
        assert!(QueryState::decode("").is_err());
        assert!(QueryState::decode("http://localhost:4000/").is_err());
    }

    #[test]
    fn test_partition_list() {
        assert_eq!(full_query().partition_list(), vec!["0", "3", "7"]);
        assert!(QueryState::default().partition_list().is_empty());
    }

    #[test]
    fn test_overlay_prefers_explicit_fields() {
        let base = full_query();
        let flags = QueryState::new("", "payments").with_key("abc");
        let merged = base.clone().overlay(&flags);

        assert_eq!(merged.topic(), "payments");
        assert_eq!(merged.key(), Some("abc"));
        assert_eq!(merged.bootstrap_servers(), base.bootstrap_servers());
        assert_eq!(merged.val_regex(), base.val_regex());
    }
}
