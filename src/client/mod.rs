//! HTTP transport for the KBrowse server.
//!
//! [`SearchClient::search`] sends one streaming request and drives a
//! [`SearchSession`] with the response as it arrives. The other methods are
//! plain request/response lookups used to fill in a query.

use std::error::Error as _;
use std::pin::pin;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn, Span};

use crate::config::Config;
use crate::error::{KbrowseError, Result};
use crate::model::{Endpoint, QueryState, SearchRequest, ServerConfigs, ServerError};
use crate::parser::{ResponseShape, StreamBuffer};
use crate::session::{SearchSession, SessionCallbacks, SessionState};
use crate::util::redact_url;

const USER_AGENT: &str = concat!("kbrowse/", env!("CARGO_PKG_VERSION"));

/// Client for one KBrowse server.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SearchClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_connect_timeout(base_url, Duration::from_secs(10))
    }

    /// Create a client with a custom connection timeout.
    ///
    /// No overall request timeout is set: a following search never ends on
    /// its own.
    pub fn with_connect_timeout(base_url: &str, connect_timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| KbrowseError::http("failed to build HTTP client", e))?;

        Ok(Self { http, base_url })
    }

    /// Create a client from configuration, with an optional server override.
    pub fn from_config(server_override: Option<&str>, config: &Config) -> Result<Self> {
        let base_url = server_override.unwrap_or(&config.server.base_url);
        Self::with_connect_timeout(base_url, config.server.connect_timeout())
    }

    /// Server base URL.
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Run a streaming search to its end.
    ///
    /// Every outcome is reported to the session's callbacks and the returned
    /// state says how the session ended. A transport failure is additionally
    /// returned as [`KbrowseError::Http`]. Cancelling `cancel` stops the
    /// search at the next chunk boundary.
    #[instrument(
        skip_all,
        fields(endpoint = endpoint.path(), topic = query.topic(), session = tracing::field::Empty)
    )]
    pub async fn search<C: SessionCallbacks>(
        &self,
        session: &mut SearchSession<C>,
        endpoint: Endpoint,
        query: &QueryState,
        cancel: &CancellationToken,
    ) -> Result<SessionState> {
        let request = session.start_at(endpoint, query);
        if let Some(id) = session.id() {
            Span::current().record("session", tracing::field::display(id));
        }

        let url = match request.url(&self.base_url) {
            Ok(url) => url,
            Err(e) => {
                session.on_transport_error(&e.to_string());
                return Err(e);
            }
        };

        let token = cancel.child_token();
        debug!(url = %redact_url(&url), "sending request");

        let sent = tokio::select! {
            biased;

            () = token.cancelled() => {
                session.cancel();
                return Ok(session.state());
            }

            sent = self.http.get(url).send() => sent,
        };

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                session.on_transport_error(&error_chain(&e));
                return Err(KbrowseError::http("sending search request", e));
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "server answered with a non-success status");
        }
        session.dispatched(token.clone());

        let mut buffer = StreamBuffer::new();
        let mut body = pin!(response.bytes_stream());
        let mut failure = None;

        while session.state().is_live() {
            tokio::select! {
                biased;

                () = token.cancelled() => {
                    session.cancel();
                }

                chunk = body.next() => match chunk {
                    Some(Ok(bytes)) => {
                        if buffer.push(&bytes) > 0 {
                            session.on_progress(buffer.as_str());
                        }
                    }
                    Some(Err(e)) => {
                        session.on_transport_error(&error_chain(&e));
                        failure = Some(e);
                    }
                    None => {
                        buffer.finish();
                        session.on_complete(buffer.as_str());
                    }
                },
            }
        }

        debug!(
            state = %session.state(),
            bytes = buffer.bytes_received(),
            results = session.results(),
            "search finished"
        );

        match failure {
            Some(e) => Err(KbrowseError::http("reading search response", e)),
            None => Ok(session.state()),
        }
    }

    /// Fetch the server's clusters, topics and deserializers.
    #[instrument(skip(self))]
    pub async fn server_configs(&self, bootstrap_servers: Option<&str>) -> Result<ServerConfigs> {
        self.get_json(&SearchRequest::server_configs(bootstrap_servers))
            .await
    }

    /// Ask the server which partition `query`'s key hashes to.
    #[instrument(skip_all, fields(topic = query.topic()))]
    pub async fn default_partition(&self, query: &QueryState) -> Result<i32> {
        let request = SearchRequest::default_partition(query)?;
        self.get_json(&request).await
    }

    async fn get_json<T: DeserializeOwned>(&self, request: &SearchRequest) -> Result<T> {
        let url = request.url(&self.base_url)?;
        let context = format!("GET {}", request.endpoint().path());
        debug!(url = %redact_url(&url), "sending request");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| KbrowseError::http(context.clone(), e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| KbrowseError::http(context.clone(), e))?;

        if ResponseShape::classify_final(&text) == ResponseShape::ErrorBody {
            let error: ServerError = serde_json::from_str(&text)
                .unwrap_or_else(|_| ServerError::message_only(text.trim()));
            return Err(KbrowseError::ServerError {
                message: error.message(),
            });
        }
        if !status.is_success() {
            return Err(KbrowseError::ServerError {
                message: format!("{status}: {}", text.trim()),
            });
        }

        serde_json::from_str(&text).map_err(|e| KbrowseError::SerializationError {
            context: format!("decoding {} response", request.endpoint().path()),
            source: e,
        })
    }
}

/// Parse a server base URL, accepting `host:port` without a scheme.
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let url = Url::parse(&with_scheme).map_err(|e| KbrowseError::InvalidUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(KbrowseError::InvalidUrl {
            url: base_url.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// An error and its causes on one line.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://localhost:4000", "http://localhost:4000/")]
    #[case("localhost:4000", "http://localhost:4000/")]
    #[case("https://kbrowse.internal/tools/", "https://kbrowse.internal/tools/")]
    fn test_parse_base_url(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse_base_url(input).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("ftp://localhost")]
    #[case("http://")]
    fn test_parse_base_url_rejects(#[case] input: &str) {
        assert!(matches!(
            parse_base_url(input),
            Err(KbrowseError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_from_config_prefers_override() {
        let config = Config::default();
        let client = SearchClient::from_config(Some("kbrowse:8080"), &config).unwrap();
        assert_eq!(client.base_url().as_str(), "http://kbrowse:8080/");

        let client = SearchClient::from_config(None, &config).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:4000/");
    }

    #[tokio::test]
    async fn test_default_partition_requires_key() {
        let client = SearchClient::new("http://localhost:1").unwrap();
        let err = client
            .default_partition(&QueryState::new("localhost:9092", "kbrowse"))
            .await
            .unwrap_err();
        assert!(matches!(err, KbrowseError::InvalidArgument { .. }));
    }
}
