//! Server-reported configuration.
//!
//! The `/server-configs` endpoint tells the client which clusters it can
//! search, which topics each cluster has, and which value deserializers and
//! schema registries are available. Maps keep the order the server sent.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Options offered by a KBrowse server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfigs {
    /// Display label to bootstrap servers.
    #[serde(default)]
    pub bootstrap_servers: IndexMap<String, String>,
    /// Display label to deserializer name.
    #[serde(default)]
    pub value_deserializers: IndexMap<String, String>,
    /// Display label to registry URL; `None` when the server has no registry.
    #[serde(default)]
    pub schema_registry_urls: Option<IndexMap<String, String>>,
    /// Bootstrap servers to topic names.
    #[serde(default)]
    pub bootstrap_topics: IndexMap<String, Vec<String>>,
}

impl ServerConfigs {
    /// Bootstrap servers of the first configured cluster.
    #[must_use]
    pub fn default_bootstrap_servers(&self) -> Option<&str> {
        self.bootstrap_servers.values().next().map(String::as_str)
    }

    /// Resolve a cluster label to its bootstrap servers, passing servers through.
    #[must_use]
    pub fn resolve_servers<'a>(&'a self, label_or_servers: &'a str) -> &'a str {
        self.bootstrap_servers
            .get(label_or_servers)
            .map_or(label_or_servers, String::as_str)
    }

    /// Sorted topics of a cluster.
    #[must_use]
    pub fn topics_for(&self, bootstrap_servers: &str) -> Vec<&str> {
        let mut topics: Vec<&str> = self
            .bootstrap_topics
            .get(bootstrap_servers)
            .map(|t| t.iter().map(String::as_str).collect())
            .unwrap_or_default();
        topics.sort_unstable();
        topics
    }

    /// Pick a topic: the preferred one if the cluster has it, else the first sorted topic.
    #[must_use]
    pub fn select_topic(&self, bootstrap_servers: &str, preferred: Option<&str>) -> Option<String> {
        let topics = self.topics_for(bootstrap_servers);
        preferred
            .filter(|p| topics.contains(p))
            .or_else(|| topics.first().copied())
            .map(str::to_string)
    }

    /// Whether schema registry selection is available.
    #[must_use]
    pub fn has_schema_registry(&self) -> bool {
        self.schema_registry_urls
            .as_ref()
            .is_some_and(|urls| !urls.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "bootstrap-servers": {"local": "localhost:9092", "prod": "kafka-1:9092,kafka-2:9092"},
        "value-deserializers": {"string": "string", "avro": "avro"},
        "schema-registry-urls": null,
        "bootstrap-topics": {"localhost:9092": ["zeta", "kbrowse", "alpha"]},
        "motd": "ignored"
    }"#;

    fn sample() -> ServerConfigs {
        serde_json::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_decode_keeps_order() {
        let configs = sample();
        let labels: Vec<_> = configs.bootstrap_servers.keys().collect();
        assert_eq!(labels, vec!["local", "prod"]);
        assert_eq!(configs.default_bootstrap_servers(), Some("localhost:9092"));
        assert!(!configs.has_schema_registry());
    }

    #[test]
    fn test_topics_sorted() {
        assert_eq!(sample().topics_for("localhost:9092"), vec!["alpha", "kbrowse", "zeta"]);
        assert!(sample().topics_for("unknown:1").is_empty());
    }

    #[test]
    fn test_select_topic() {
        let configs = sample();
        assert_eq!(
            configs.select_topic("localhost:9092", Some("kbrowse")).as_deref(),
            Some("kbrowse")
        );
        assert_eq!(
            configs.select_topic("localhost:9092", Some("missing")).as_deref(),
            Some("alpha")
        );
        assert_eq!(configs.select_topic("unknown:1", Some("kbrowse")), None);
    }

    #[test]
    fn test_resolve_servers() {
        let configs = sample();
        assert_eq!(configs.resolve_servers("prod"), "kafka-1:9092,kafka-2:9092");
        assert_eq!(configs.resolve_servers("other:9092"), "other:9092");
    }
}
