//! CLI command implementations.
//!
//! Each command is implemented in its own module with a `run` function
//! that handles the command logic.

pub mod config;
pub mod configs;
pub mod curl;
pub mod link;
pub mod partition;
pub mod search;

use std::future::Future;

use tracing::debug;

use crate::client::SearchClient;
use crate::error::{KbrowseError, Result};
use crate::model::QueryState;

/// Run a future to completion on a single-threaded runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| KbrowseError::io("Failed to build tokio runtime", e))?;

    Ok(runtime.block_on(future))
}

/// Fill in a missing cluster or topic from the server's configs.
///
/// A cluster label (as shown in the server's configs) is resolved to its
/// bootstrap servers. The server is only asked when something is missing
/// or may be a label.
pub async fn resolve_query(client: &SearchClient, query: QueryState) -> Result<QueryState> {
    let servers = query.bootstrap_servers();
    let maybe_label = !servers.is_empty() && !servers.contains(':');
    if !servers.is_empty() && !query.topic().is_empty() && !maybe_label {
        return Ok(query);
    }

    let configs = client.server_configs(None).await?;

    let servers = if query.bootstrap_servers().is_empty() {
        configs.default_bootstrap_servers().unwrap_or_default()
    } else {
        configs.resolve_servers(query.bootstrap_servers())
    }
    .to_string();
    if servers.is_empty() {
        return Err(KbrowseError::invalid_argument(
            "bootstrap-servers",
            "none given and the server reports no clusters",
        ));
    }

    let topic = if query.topic().is_empty() {
        configs.select_topic(&servers, None).ok_or_else(|| {
            KbrowseError::invalid_argument("topic", format!("none given and {servers} has no topics"))
        })?
    } else {
        query.topic().to_string()
    };

    debug!(%servers, %topic, "resolved query from server configs");
    Ok(query.with_bootstrap_servers(servers).with_topic(topic))
}
