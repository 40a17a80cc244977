//! Incremental parsing of streaming search responses.
//!
//! A search response body grows while the server scans the topic. The
//! parsers here work on the *cumulative* text received so far:
//!
//! - [`StreamBuffer`] turns arriving byte chunks into a growing `String`,
//!   holding back a multi-byte character split across chunks
//! - [`ResponseShape::classify`] decides, once per response, whether the body
//!   is an error object, a streaming array or opaque text
//! - [`frames`] yields each top-level JSON object as soon as its closing
//!   brace arrives, resuming from a [`StreamCursor`] so no byte is scanned twice
//!
//! # Example
//!
//! ```rust
//! use kbrowse_client::parser::{feed, StreamCursor, STREAM_SENTINEL};
//!
//! let mut cursor = StreamCursor::new(STREAM_SENTINEL.len());
//! let mut text = String::from(r#"[{"type":"pioneer"},{"type":"res"#);
//! assert!(feed(&text, &mut cursor).is_empty());
//!
//! text.push_str(r#"ult","offset":5}"#);
//! assert_eq!(feed(&text, &mut cursor), vec![r#"{"type":"result","offset":5}"#]);
//! ```

mod buffer;
mod framing;
mod sentinel;

pub use buffer::*;
pub use framing::*;
pub use sentinel::*;

/// Truncate a string for log previews.
///
/// Uses character-aware truncation to avoid panicking on multi-byte UTF-8 characters.
pub(crate) fn truncate_preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}
