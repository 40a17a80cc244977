//! Terminal output for a running search.
//!
//! [`TerminalRenderer`] is the command-line implementation of
//! [`SessionCallbacks`]: results go to the output writer, the loading
//! indicator and scan position go to a spinner on stderr.

use std::io::{self, Write};
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tokio_util::sync::CancellationToken;

use crate::model::{Progress, ResultRecord, ServerError};
use crate::session::SessionCallbacks;

const SEPARATOR_WIDTH: usize = 40;

/// How results are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultFormat {
    /// Indented JSON followed by a separator line.
    #[default]
    Pretty,
    /// One compact JSON object per line.
    Lines,
}

/// Rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Result layout.
    pub format: ResultFormat,
    /// Style the separator line.
    pub color: bool,
    /// Show the loading spinner with the scan position.
    pub progress: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: ResultFormat::Pretty,
            color: true,
            progress: true,
        }
    }
}

/// Writes search events to a terminal.
pub struct TerminalRenderer<W: Write> {
    out: W,
    options: RenderOptions,
    spinner: Option<ProgressBar>,
    results: usize,
    last_error: Option<ServerError>,
    write_error: Option<io::Error>,
    cancel_on_write_error: Option<CancellationToken>,
}

impl<W: Write> TerminalRenderer<W> {
    /// Create a renderer writing results to `out`.
    pub fn new(out: W, options: RenderOptions) -> Self {
        Self {
            out,
            options,
            spinner: None,
            results: 0,
            last_error: None,
            write_error: None,
            cancel_on_write_error: None,
        }
    }

    /// Cancel `token` if the output can no longer be written (a closed pipe).
    #[must_use]
    pub fn cancel_on_write_error(mut self, token: CancellationToken) -> Self {
        self.cancel_on_write_error = Some(token);
        self
    }

    /// Results written in the current session.
    pub const fn results(&self) -> usize {
        self.results
    }

    /// Error reported in the current session.
    pub const fn last_error(&self) -> Option<&ServerError> {
        self.last_error.as_ref()
    }

    /// Take the first output failure, if any.
    pub fn take_write_error(&mut self) -> Option<io::Error> {
        self.write_error.take()
    }

    /// The output writer.
    pub const fn output(&self) -> &W {
        &self.out
    }

    /// Consume the renderer, returning the output writer.
    pub fn into_output(self) -> W {
        self.out
    }

    fn write_with<F>(&mut self, write: F)
    where
        F: FnOnce(&mut W, &RenderOptions) -> io::Result<()>,
    {
        if self.write_error.is_some() {
            return;
        }

        let Self {
            out,
            options,
            spinner,
            ..
        } = self;
        let result = match spinner {
            Some(spinner) => spinner.suspend(|| write(out, &*options).and_then(|()| out.flush())),
            None => write(out, &*options).and_then(|()| out.flush()),
        };

        if let Err(e) = result {
            tracing::debug!(error = %e, "output closed");
            if let Some(token) = &self.cancel_on_write_error {
                token.cancel();
            }
            self.write_error = Some(e);
        }
    }
}

impl<W: Write> SessionCallbacks for TerminalRenderer<W> {
    fn on_reset(&mut self) {
        self.results = 0;
        self.last_error = None;
    }

    fn on_loading_start(&mut self) {
        if !self.options.progress {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style.tick_strings(&[
                "Loading   ",
                "Loading.  ",
                "Loading.. ",
                "Loading...",
                "Loading...",
            ]));
        }
        spinner.enable_steady_tick(Duration::from_millis(500));
        self.spinner = Some(spinner);
    }

    fn on_loading_end(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn on_progress(&mut self, progress: &Progress) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(format_progress(progress));
        }
    }

    fn on_result(&mut self, record: &ResultRecord) {
        self.results += 1;
        self.write_with(|out, options| write_record(out, record, options));
    }

    fn on_raw_chunk(&mut self, chunk: &str) {
        self.write_with(|out, _| out.write_all(chunk.as_bytes()));
    }

    fn on_error(&mut self, error: &ServerError) {
        self.last_error = Some(error.clone());
    }
}

/// One-line description of a scan position.
pub fn format_progress(progress: &Progress) -> String {
    let mut parts = Vec::with_capacity(4);

    if let Some(partition) = progress.partition {
        parts.push(format!("partition {partition}"));
    }
    if let Some(offset) = progress.offset {
        parts.push(format!("offset {offset}"));
    }
    if let Some(time) = progress.timestamp_utc() {
        parts.push(time.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string());
    }
    parts.push(match progress.count {
        1 => "1 result".to_string(),
        n => format!("{n} results"),
    });

    parts.join(", ")
}

fn write_record<W: Write>(out: &mut W, record: &ResultRecord, options: &RenderOptions) -> io::Result<()> {
    match options.format {
        ResultFormat::Lines => {
            serde_json::to_writer(&mut *out, record)?;
            writeln!(out)
        }
        ResultFormat::Pretty => {
            let mut serializer =
                serde_json::Serializer::with_formatter(&mut *out, PrettyFormatter::with_indent(b"    "));
            record.serialize(&mut serializer)?;
            writeln!(out)?;
            writeln!(
                out,
                "{}",
                style("─".repeat(SEPARATOR_WIDTH))
                    .dim()
                    .force_styling(options.color)
            )
        }
    }
}
