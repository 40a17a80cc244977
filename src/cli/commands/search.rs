//! Search command implementation.
//!
//! Streams matches of a live search (or a cached replay) to stdout while the
//! scan position is shown on stderr.

use std::io::{self, IsTerminal};

use console::style;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{block_on, resolve_query};
use crate::cli::{Cli, OutputFormat, SearchArgs};
use crate::client::SearchClient;
use crate::config::Config;
use crate::error::{KbrowseError, Result};
use crate::model::{Endpoint, ServerError};
use crate::render::{RenderOptions, ResultFormat, TerminalRenderer};
use crate::session::{SearchSession, SessionState};

/// Run the search command.
pub fn run(cli: &Cli, config: &Config, args: &SearchArgs, endpoint: Endpoint) -> Result<()> {
    let client = SearchClient::from_config(cli.server.as_deref(), config)?;
    let query = args.query.to_query(config)?;
    let limit = args.timeout.as_deref().copied();

    let options = RenderOptions {
        format: match cli.effective_output() {
            OutputFormat::Json => ResultFormat::Lines,
            OutputFormat::Text if config.display.pretty_json => ResultFormat::Pretty,
            OutputFormat::Text => ResultFormat::Lines,
        },
        color: config.display.color && console::colors_enabled(),
        progress: config.display.progress
            && !args.no_progress
            && !cli.quiet
            && io::stderr().is_terminal(),
    };

    block_on(async {
        let query = resolve_query(&client, query).await?;

        let cancel = CancellationToken::new();
        let ctrl_c = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    debug!("interrupt received");
                    cancel.cancel();
                }
            })
        };

        let renderer =
            TerminalRenderer::new(io::stdout().lock(), options).cancel_on_write_error(cancel.clone());
        let mut session = SearchSession::new(renderer).with_print_offset(config.search.print_offset);

        let search = client.search(&mut session, endpoint, &query, &cancel);
        let outcome = match limit {
            Some(limit) => tokio::time::timeout(limit, search).await.ok(),
            None => Some(search.await),
        };
        let Some(outcome) = outcome else {
            session.cancel();
            ctrl_c.abort();
            return Err(KbrowseError::Timeout {
                duration_ms: limit.map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            });
        };
        ctrl_c.abort();

        let state = outcome?;
        let mut renderer = session.into_callbacks();
        finish(cli, state, &mut renderer)
    })?
}

/// Map how the session ended onto the command's result.
fn finish<W: io::Write>(cli: &Cli, state: SessionState, renderer: &mut TerminalRenderer<W>) -> Result<()> {
    if let Some(e) = renderer.take_write_error() {
        // A reader that went away (`| head`) is a normal way to stop.
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(KbrowseError::io("Failed to write results", e));
    }

    match state {
        SessionState::Completed => {
            if !cli.quiet {
                let count = renderer.results();
                let noun = if count == 1 { "result" } else { "results" };
                eprintln!("{}", style(format!("{count} {noun}")).dim());
            }
            Ok(())
        }
        SessionState::Cancelled => Err(KbrowseError::Interrupted),
        SessionState::Failed => Err(KbrowseError::ServerError {
            message: renderer
                .last_error()
                .map_or_else(|| "search failed".to_string(), ServerError::message),
        }),
        SessionState::Idle | SessionState::Starting | SessionState::Streaming => {
            debug!(%state, "search returned while still live");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use crate::session::SessionCallbacks;

    fn renderer() -> TerminalRenderer<Vec<u8>> {
        TerminalRenderer::new(
            Vec::new(),
            RenderOptions {
                progress: false,
                ..RenderOptions::default()
            },
        )
    }

    #[test]
    fn test_finish_maps_states() {
        let cli = Cli::parse_from(["kbrowse", "-q", "search"]);

        assert!(finish(&cli, SessionState::Completed, &mut renderer()).is_ok());
        assert!(matches!(
            finish(&cli, SessionState::Cancelled, &mut renderer()),
            Err(KbrowseError::Interrupted)
        ));

        let mut failed = renderer();
        failed.on_error(&ServerError::message_only("topic not found"));
        match finish(&cli, SessionState::Failed, &mut failed) {
            Err(KbrowseError::ServerError { message }) => assert_eq!(message, "topic not found"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
