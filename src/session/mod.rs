//! Lifecycle of one streaming search.
//!
//! A [`SearchSession`] owns the parse cursor and the transport's abort handle
//! for the query currently in flight. The transport drives it with events
//! (dispatch, cumulative text, completion, failure) and the session reports
//! to the surrounding application through [`SessionCallbacks`].
//!
//! ```text
//! Idle -> Starting -> Streaming -> Completed | Cancelled | Failed
//! ```
//!
//! Starting a new query while one is live cancels the old one first. Every
//! started session ends its loading indicator exactly once, whichever way it
//! terminates.

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::{
    Endpoint, Progress, QueryState, ResultRecord, SearchRequest, ServerError, DEFAULT_PRINT_OFFSET,
};
use crate::parser::{feed, truncate_preview, ResponseShape, StreamCursor};

/// Receiver of session events.
///
/// Every method has an empty default so implementors only handle what they
/// display.
pub trait SessionCallbacks {
    /// Prior results should be cleared.
    fn on_reset(&mut self) {}

    /// A request is about to be sent.
    fn on_loading_start(&mut self) {}

    /// The session reached a terminal state.
    fn on_loading_end(&mut self) {}

    /// An object reported a scan position.
    fn on_progress(&mut self, _progress: &Progress) {}

    /// A matching record arrived.
    fn on_result(&mut self, _record: &ResultRecord) {}

    /// New text of a response that is not JSON.
    fn on_raw_chunk(&mut self, _chunk: &str) {}

    /// The server reported an error or the transport failed.
    fn on_error(&mut self, _error: &ServerError) {}
}

impl<T: SessionCallbacks + ?Sized> SessionCallbacks for &mut T {
    fn on_reset(&mut self) {
        (**self).on_reset();
    }

    fn on_loading_start(&mut self) {
        (**self).on_loading_start();
    }

    fn on_loading_end(&mut self) {
        (**self).on_loading_end();
    }

    fn on_progress(&mut self, progress: &Progress) {
        (**self).on_progress(progress);
    }

    fn on_result(&mut self, record: &ResultRecord) {
        (**self).on_result(record);
    }

    fn on_raw_chunk(&mut self, chunk: &str) {
        (**self).on_raw_chunk(chunk);
    }

    fn on_error(&mut self, error: &ServerError) {
        (**self).on_error(error);
    }
}

/// Handle that stops a dispatched request.
pub trait AbortHandle: fmt::Debug + Send {
    /// Stop delivering events for the request.
    fn abort(&self);
}

impl AbortHandle for CancellationToken {
    fn abort(&self) {
        self.cancel();
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No query submitted yet.
    #[default]
    Idle,
    /// Request built, not yet confirmed by the transport.
    Starting,
    /// Response is arriving.
    Streaming,
    /// Response ended normally.
    Completed,
    /// Stopped by the user or replaced by a newer query.
    Cancelled,
    /// The server reported an error or the transport failed.
    Failed,
}

impl SessionState {
    /// Whether a request is in flight.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Starting | Self::Streaming)
    }

    /// Whether the session has ended.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controller for the one live search.
pub struct SearchSession<C> {
    callbacks: C,
    print_offset: u64,
    id: Option<Uuid>,
    state: SessionState,
    shape: Option<ResponseShape>,
    cursor: StreamCursor,
    raw_forwarded: usize,
    results: usize,
    malformed: usize,
    last_progress: Option<Progress>,
    loading: bool,
    transport: Option<Box<dyn AbortHandle>>,
}

impl<C: SessionCallbacks> SearchSession<C> {
    /// Create an idle session reporting to `callbacks`.
    pub fn new(callbacks: C) -> Self {
        Self {
            callbacks,
            print_offset: DEFAULT_PRINT_OFFSET,
            id: None,
            state: SessionState::Idle,
            shape: None,
            cursor: StreamCursor::default(),
            raw_forwarded: 0,
            results: 0,
            malformed: 0,
            last_progress: None,
            loading: false,
            transport: None,
        }
    }

    /// Set the `print-offset` sent with every request.
    #[must_use]
    pub fn with_print_offset(mut self, print_offset: u64) -> Self {
        self.print_offset = print_offset;
        self
    }

    /// Begin a search and return the request to send.
    pub fn start(&mut self, query: &QueryState) -> SearchRequest {
        self.start_at(Endpoint::Search, query)
    }

    /// Begin a session against a specific streaming endpoint.
    pub fn start_at(&mut self, endpoint: Endpoint, query: &QueryState) -> SearchRequest {
        if self.state.is_live() {
            info!(session = ?self.id, "replacing live session");
            self.cancel();
        }

        let id = Uuid::new_v4();
        self.id = Some(id);
        self.state = SessionState::Starting;
        self.shape = None;
        self.cursor = StreamCursor::default();
        self.raw_forwarded = 0;
        self.results = 0;
        self.malformed = 0;
        self.last_progress = None;

        let request = SearchRequest::from_query(endpoint, query, self.print_offset);
        info!(session = %id, endpoint = endpoint.path(), topic = query.topic(), "starting search");

        self.callbacks.on_reset();
        self.loading = true;
        self.callbacks.on_loading_start();

        request
    }

    /// The transport sent the request.
    pub fn dispatched(&mut self, handle: impl AbortHandle + 'static) {
        match self.state {
            SessionState::Starting | SessionState::Streaming => {
                self.state = SessionState::Streaming;
                self.transport = Some(Box::new(handle));
            }
            state => {
                debug!(session = ?self.id, %state, "dispatch confirmed after session ended");
                handle.abort();
            }
        }
    }

    /// Cumulative response text grew.
    pub fn on_progress(&mut self, full_text: &str) {
        if !self.state.is_live() {
            return;
        }
        self.state = SessionState::Streaming;

        let shape = match self.shape {
            Some(shape) => shape,
            None => match ResponseShape::classify(full_text) {
                Some(shape) => self.classified(shape),
                None => return,
            },
        };

        self.dispatch(shape, full_text, false);
    }

    /// The response ended normally with `full_text`.
    pub fn on_complete(&mut self, full_text: &str) {
        if !self.state.is_live() {
            return;
        }

        let shape = match self.shape {
            Some(shape) => shape,
            None => self.classified(ResponseShape::classify_final(full_text)),
        };
        self.dispatch(shape, full_text, true);

        if !self.state.is_live() {
            return;
        }
        if self.cursor.is_mid_object() {
            debug!(
                session = ?self.id,
                start = ?self.cursor.object_start(),
                "response ended inside an object"
            );
        }

        info!(
            session = ?self.id,
            results = self.results,
            malformed = self.malformed,
            "search completed"
        );
        self.finish(SessionState::Completed);
    }

    /// The transport failed before the response completed.
    pub fn on_transport_error(&mut self, message: &str) {
        if !self.state.is_live() {
            return;
        }

        warn!(session = ?self.id, error = message, "transport failed");
        self.callbacks.on_error(&ServerError::message_only(message));
        self.finish(SessionState::Failed);
    }

    /// Stop the live request. Returns whether anything was cancelled.
    ///
    /// Results already delivered stay delivered.
    pub fn cancel(&mut self) -> bool {
        if !self.state.is_live() {
            return false;
        }

        info!(session = ?self.id, results = self.results, "search cancelled");
        self.finish(SessionState::Cancelled);
        true
    }

    /// Current state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Shape of the current response, once known.
    pub const fn shape(&self) -> Option<ResponseShape> {
        self.shape
    }

    /// Id of the current or last session.
    pub const fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// Results delivered in the current session.
    pub const fn results(&self) -> usize {
        self.results
    }

    /// Objects skipped because they did not decode.
    pub const fn malformed(&self) -> usize {
        self.malformed
    }

    /// Latest reported scan position.
    pub const fn last_progress(&self) -> Option<Progress> {
        self.last_progress
    }

    /// Parse position in the current response.
    pub const fn cursor(&self) -> &StreamCursor {
        &self.cursor
    }

    /// The callback receiver.
    pub const fn callbacks(&self) -> &C {
        &self.callbacks
    }

    /// The callback receiver, mutably.
    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    /// Consume the session, returning the callback receiver.
    pub fn into_callbacks(self) -> C {
        self.callbacks
    }

    fn classified(&mut self, shape: ResponseShape) -> ResponseShape {
        debug!(session = ?self.id, shape = shape.as_str(), "response classified");
        self.shape = Some(shape);
        self.cursor = StreamCursor::new(shape.framing_prefix_len());
        shape
    }

    fn dispatch(&mut self, shape: ResponseShape, full_text: &str, is_final: bool) {
        match shape {
            ResponseShape::ErrorBody => {
                if let Some(error) = decode_error_body(full_text, is_final) {
                    warn!(session = ?self.id, error = %error.message(), "server reported an error");
                    self.callbacks.on_error(&error);
                    self.finish(SessionState::Failed);
                }
            }
            ResponseShape::StreamingBody => {
                for frame in feed(full_text, &mut self.cursor) {
                    self.dispatch_frame(frame);
                }
            }
            ResponseShape::RawBody => {
                if let Some(delta) = full_text.get(self.raw_forwarded..) {
                    if !delta.is_empty() {
                        self.callbacks.on_raw_chunk(delta);
                        self.raw_forwarded = full_text.len();
                    }
                }
            }
        }
    }

    fn dispatch_frame(&mut self, frame: &str) {
        let record = match serde_json::from_str::<ResultRecord>(frame) {
            Ok(record) => record,
            Err(e) => {
                self.malformed += 1;
                debug!(
                    session = ?self.id,
                    error = %e,
                    frame = %truncate_preview(frame, 100),
                    "skipping malformed object"
                );
                return;
            }
        };

        if record.is_result() {
            self.results += 1;
            self.callbacks.on_result(&record);
        }

        if let Some(progress) = record.progress(self.results) {
            self.last_progress = Some(progress);
            self.callbacks.on_progress(&progress);
        }
    }

    fn finish(&mut self, state: SessionState) {
        self.state = state;

        if let Some(handle) = self.transport.take() {
            if state != SessionState::Completed {
                handle.abort();
            }
        }

        if self.loading {
            self.loading = false;
            self.callbacks.on_loading_end();
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for SearchSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("shape", &self.shape)
            .field("results", &self.results)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

/// Decode the first JSON value of an error body.
///
/// `None` means the body is still incomplete and more text may follow.
fn decode_error_body(text: &str, is_final: bool) -> Option<ServerError> {
    let mut values = serde_json::Deserializer::from_str(text).into_iter::<ServerError>();

    match values.next() {
        Some(Ok(error)) => Some(error),
        Some(Err(e)) if e.is_eof() && !is_final => None,
        _ => Some(ServerError::message_only(text.trim())),
    }
}
