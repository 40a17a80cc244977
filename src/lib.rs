//! kbrowse-client: streaming search client for KBrowse.
//!
//! A KBrowse server scans Kafka topics and streams its findings back as one
//! long JSON array that grows while the search runs. This crate turns that
//! growing body into typed events as soon as each object is complete.
//!
//! # Quick Start
//!
//! ```rust
//! use kbrowse_client::prelude::*;
//!
//! #[derive(Default)]
//! struct Printer(Vec<String>);
//!
//! impl SessionCallbacks for Printer {
//!     fn on_result(&mut self, record: &ResultRecord) {
//!         if let Some(value) = record.field("value") {
//!             self.0.push(value.to_string());
//!         }
//!     }
//! }
//!
//! let query = QueryState::new("localhost:9092", "orders").with_key("user-42");
//! let mut session = SearchSession::new(Printer::default());
//! let request = session.start(&query);
//! assert_eq!(request.param("topics"), Some("orders"));
//!
//! session.on_progress(r#"[{"type":"pioneer"},{"type":"result","partition":0,"offset":3,"value":"a"}"#);
//! session.on_complete(r#"[{"type":"pioneer"},{"type":"result","partition":0,"offset":3,"value":"a"}]"#);
//!
//! assert_eq!(session.state(), SessionState::Completed);
//! assert_eq!(session.callbacks().0, vec![r#""a""#]);
//! ```
//!
//! # Architecture
//!
//! - [`model`]: Queries, requests, and the objects a search streams back
//! - [`parser`]: Incremental framing of the cumulative response text
//! - [`session`]: Lifecycle of one search and the event callbacks
//! - [`client`]: HTTP transport driving a session
//! - [`render`]: Terminal output for search events
//! - [`cli`]: Command-line interface
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;
pub mod session;
pub mod util;

// Re-export commonly used types at the crate root
pub use error::{KbrowseError, Result};
pub use model::QueryState;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::SearchClient;
    pub use crate::error::{KbrowseError, Result};
    pub use crate::model::{
        Endpoint, Progress, QueryState, ResultRecord, SearchRequest, ServerConfigs, ServerError,
    };
    pub use crate::parser::{feed, ResponseShape, StreamBuffer, StreamCursor};
    pub use crate::session::{AbortHandle, SearchSession, SessionCallbacks, SessionState};
}
