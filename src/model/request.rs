//! Outgoing requests to the KBrowse server.
//!
//! Building a request from a [`QueryState`] is one-directional: it applies
//! the server's parameter names and the filter conventions. A value regex is
//! wrapped as `.*value.*` so it matches anywhere in the value; a key regex is
//! sent verbatim because keys are usually matched exactly.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::Url;

use super::QueryState;
use crate::error::{KbrowseError, Result};

/// Record interval at which the server reports its scan position.
pub const DEFAULT_PRINT_OFFSET: u64 = 10_000;

/// Characters escaped inside a query parameter value.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Server endpoints used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Live streaming search.
    Search,
    /// Replay of a previously shared result set.
    Cached,
    /// Default partition lookup for a key.
    DefaultPartition,
    /// Cluster, topic and deserializer options.
    ServerConfigs,
}

impl Endpoint {
    /// URL path of the endpoint.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Search => "/search",
            Self::Cached => "/cached",
            Self::DefaultPartition => "/default-partition",
            Self::ServerConfigs => "/server-configs",
        }
    }

    /// Whether the endpoint answers with a streaming search body.
    #[must_use]
    pub const fn is_streaming(self) -> bool {
        matches!(self, Self::Search | Self::Cached)
    }
}

/// A GET request against the KBrowse server: endpoint plus ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    endpoint: Endpoint,
    params: Vec<(&'static str, String)>,
}

impl SearchRequest {
    /// Build a search (or cached replay) request from a query.
    ///
    /// Unset optional fields are omitted.
    #[must_use]
    pub fn from_query(endpoint: Endpoint, query: &QueryState, print_offset: u64) -> Self {
        let mut params = vec![
            ("bootstrap-servers", query.bootstrap_servers().to_string()),
            // The server accepts a CSV of topics; a session searches exactly one.
            ("topics", query.topic().to_string()),
            ("print-offset", print_offset.to_string()),
        ];

        if let Some(key) = query.key() {
            params.push(("key-regex", key.to_string()));
        }
        if let Some(value) = query.val_regex() {
            params.push(("val-regex", format!(".*{value}.*")));
        }
        if let Some(deserializer) = query.value_deserializer() {
            params.push(("value-deserializer", deserializer.to_string()));
        }
        if let Some(url) = query.schema_registry_url() {
            params.push(("schema-registry-url", url.to_string()));
        }
        if let Some(offset) = query.relative_offset() {
            params.push(("relative-offset", offset.to_string()));
        }
        if query.follow() {
            params.push(("follow", "true".to_string()));
        }
        if query.default_partition() {
            params.push(("default-partition", "true".to_string()));
        }
        if let Some(partitions) = query.partitions() {
            params.push(("partitions", partitions.to_string()));
        }

        Self { endpoint, params }
    }

    /// Build a default partition lookup for the query's key.
    pub fn default_partition(query: &QueryState) -> Result<Self> {
        let key = query
            .key()
            .ok_or_else(|| KbrowseError::invalid_argument("key", "please enter a key first"))?;

        Ok(Self {
            endpoint: Endpoint::DefaultPartition,
            params: vec![
                ("bootstrap-servers", query.bootstrap_servers().to_string()),
                ("topic", query.topic().to_string()),
                ("key", key.to_string()),
            ],
        })
    }

    /// Build a server configuration request.
    #[must_use]
    pub fn server_configs(bootstrap_servers: Option<&str>) -> Self {
        let params = bootstrap_servers
            .filter(|s| !s.is_empty())
            .map(|s| vec![("bootstrap-servers", s.to_string())])
            .unwrap_or_default();

        Self {
            endpoint: Endpoint::ServerConfigs,
            params,
        }
    }

    /// Target endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Ordered query parameters.
    #[must_use]
    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Look up a parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Path and query string, e.g. `/search?bootstrap-servers=...`.
    #[must_use]
    pub fn path(&self) -> String {
        if self.params.is_empty() {
            return self.endpoint.path().to_string();
        }

        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{k}={}", utf8_percent_encode(v, QUERY_VALUE)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{query}", self.endpoint.path())
    }

    /// Absolute URL against a server base URL.
    ///
    /// A path prefix on the base (`http://host/kbrowse/`) is kept.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let joined = format!("{}{}", base.as_str().trim_end_matches('/'), self.path());
        Url::parse(&joined).map_err(|e| KbrowseError::InvalidUrl {
            url: joined.clone(),
            reason: e.to_string(),
        })
    }

    /// A `curl` command reproducing this request.
    pub fn curl_command(&self, base: &Url) -> Result<String> {
        Ok(format!("curl \"{}\"", self.url(base)?))
    }
}

impl fmt::Display for SearchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
