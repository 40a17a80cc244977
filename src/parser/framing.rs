//! Top-level JSON object framing over a growing text.
//!
//! The caller re-presents the same buffer on every call, longer than before
//! and never modified retroactively. [`frames`] scans only the bytes added
//! since the previous call and yields every object whose closing brace has
//! arrived. Text between objects (the array's `[`, commas, whitespace) is
//! skipped. A partial object is never yielded; its start, depth and string
//! state stay in the cursor until the rest arrives.
//!
//! Braces inside JSON string literals are not structural. Whether a frame is
//! valid JSON is left to the caller's decoder.
//!
//! A broken string literal (say, a missing closing quote) would otherwise
//! shift string tracking for the rest of the stream. When the scan reaches
//! text that cannot occur in JSON under the current string state, the open
//! object is rescanned counting braces only. It is then yielded at its first
//! brace-balanced end, where the decoder rejects it, and scanning continues
//! after it.

use tracing::{debug, warn};

/// Resumable scan position over a growing stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCursor {
    /// Length of the skipped framing prefix.
    origin: usize,
    /// End of the last emitted object (or of the skipped prefix).
    consumed_up_to: usize,
    /// Next byte to scan. Ahead of `consumed_up_to` while inside an object.
    scanned_up_to: usize,
    /// Start of the object being scanned.
    object_start: Option<usize>,
    depth: usize,
    in_string: bool,
    escaped: bool,
    /// A string just closed; only a separator or a closing bracket may follow.
    after_string: bool,
    /// Count braces only until the open object closes.
    braces_only: bool,
}

/// Outcome of scanning one byte.
enum Step {
    Continue,
    /// An object closed; its start.
    Closed(usize),
    /// The string state cannot be right; rescan the open object.
    Resync,
}

impl StreamCursor {
    /// Create a cursor that skips the first `framing_prefix_len` bytes.
    #[must_use]
    pub const fn new(framing_prefix_len: usize) -> Self {
        Self {
            origin: framing_prefix_len,
            consumed_up_to: framing_prefix_len,
            scanned_up_to: framing_prefix_len,
            object_start: None,
            depth: 0,
            in_string: false,
            escaped: false,
            after_string: false,
            braces_only: false,
        }
    }

    /// Bytes fully parsed and emitted, or skipped.
    #[must_use]
    pub const fn consumed_up_to(&self) -> usize {
        self.consumed_up_to
    }

    /// Start of the currently open object.
    #[must_use]
    pub const fn object_start(&self) -> Option<usize> {
        self.object_start
    }

    /// Current brace depth.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Whether an object has started but not yet closed.
    #[must_use]
    pub const fn is_mid_object(&self) -> bool {
        self.object_start.is_some()
    }

    /// Advance over one byte.
    fn step(&mut self, i: usize, byte: u8) -> Step {
        if self.braces_only {
            return self.step_brace(i, byte);
        }

        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
                self.after_string = true;
            } else if byte < 0x20 {
                // Raw control characters never appear inside a JSON string.
                return Step::Resync;
            }
            return Step::Continue;
        }

        if self.after_string {
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' => return Step::Continue,
                b':' | b',' | b'}' | b']' => self.after_string = false,
                _ => return Step::Resync,
            }
        }

        match byte {
            // Quotes in depth-0 framing noise never open a string.
            b'"' if self.depth > 0 => {
                self.in_string = true;
                Step::Continue
            }
            _ => self.step_brace(i, byte),
        }
    }

    fn step_brace(&mut self, i: usize, byte: u8) -> Step {
        match byte {
            b'{' => {
                if self.depth == 0 {
                    self.object_start = Some(i);
                }
                self.depth += 1;
            }
            b'}' if self.depth > 0 => {
                self.depth -= 1;
                if self.depth == 0 {
                    self.braces_only = false;
                    self.consumed_up_to = i + 1;
                    if let Some(start) = self.object_start.take() {
                        return Step::Closed(start);
                    }
                }
            }
            _ => {}
        }
        Step::Continue
    }

    /// Rewind to the open object and rescan it counting braces only.
    fn resync(&mut self, at: usize) {
        let Some(start) = self.object_start.take() else {
            return;
        };
        debug!(start, at, "invalid string state inside object; rescanning by braces");

        self.scanned_up_to = start;
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
        self.after_string = false;
        self.braces_only = true;
    }
}

impl Default for StreamCursor {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Iterator over the objects completed by the newest part of the text.
///
/// Dropping it early is fine: the cursor stops right after the last yielded
/// object and the next call resumes there.
#[derive(Debug)]
pub struct Frames<'t, 'c> {
    text: &'t str,
    cursor: &'c mut StreamCursor,
}

impl<'t> Iterator for Frames<'t, '_> {
    type Item = &'t str;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();

        while self.cursor.scanned_up_to < bytes.len() {
            let i = self.cursor.scanned_up_to;
            self.cursor.scanned_up_to += 1;

            match self.cursor.step(i, bytes[i]) {
                // Both ends sit on ASCII braces, so they are char boundaries.
                Step::Closed(start) => return self.text.get(start..=i),
                Step::Resync => self.cursor.resync(i),
                Step::Continue => {}
            }
        }

        None
    }
}

/// Scan the unscanned tail of `full_text` for complete top-level objects.
pub fn frames<'t, 'c>(full_text: &'t str, cursor: &'c mut StreamCursor) -> Frames<'t, 'c> {
    if full_text.len() < cursor.scanned_up_to && cursor.scanned_up_to > cursor.origin {
        warn!(
            text_len = full_text.len(),
            scanned_up_to = cursor.scanned_up_to,
            "stream text shrank below the parse cursor; ignoring"
        );
    }

    Frames {
        text: full_text,
        cursor,
    }
}

/// Collect every newly completed object.
pub fn feed<'t>(full_text: &'t str, cursor: &mut StreamCursor) -> Vec<&'t str> {
    frames(full_text, cursor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PREFIX: &str = r#"[{"type":"pioneer"}"#;

    #[test]
    fn test_skips_prefix_and_framing_noise() {
        let text = format!("{PREFIX},\n {{\"a\":1}} , {{\"b\":2}}");
        let mut cursor = StreamCursor::new(PREFIX.len());

        assert_eq!(feed(&text, &mut cursor), vec![r#"{"a":1}"#, r#"{"b":2}"#]);
        assert_eq!(cursor.consumed_up_to(), text.len());
    }

    #[test]
    fn test_partial_object_waits() {
        let mut cursor = StreamCursor::new(0);
        let mut text = String::from(r#",{"a":{"b":"#);

        assert!(feed(&text, &mut cursor).is_empty());
        assert_eq!(cursor.object_start(), Some(1));
        assert_eq!(cursor.depth(), 2);
        assert_eq!(cursor.consumed_up_to(), 0);

        text.push_str("1}}");
        assert_eq!(feed(&text, &mut cursor), vec![r#"{"a":{"b":1}}"#]);
        assert!(!cursor.is_mid_object());
    }

    #[test]
    fn test_same_text_yields_nothing_twice() {
        let text = r#"{"a":1},{"b""#;
        let mut cursor = StreamCursor::new(0);

        assert_eq!(feed(text, &mut cursor).len(), 1);
        assert!(feed(text, &mut cursor).is_empty());
        assert!(feed(text, &mut cursor).is_empty());
    }

    #[test]
    fn test_braces_in_strings_are_not_structural() {
        let text = r#"{"v":"}{ \"}\" {"},{"w":"\\"}"#;
        let mut cursor = StreamCursor::new(0);

        assert_eq!(
            feed(text, &mut cursor),
            vec![r#"{"v":"}{ \"}\" {"}"#, r#"{"w":"\\"}"#]
        );
    }

    #[test]
    fn test_string_split_across_chunks() {
        let mut cursor = StreamCursor::new(0);
        let mut text = String::from(r#"{"v":"a\"#);
        assert!(feed(&text, &mut cursor).is_empty());

        text.push_str(r#""}"}"#);
        assert_eq!(feed(&text, &mut cursor), vec![r#"{"v":"a\"}"}"#]);
    }

    #[test]
    fn test_stray_close_brace_at_depth_zero_is_ignored() {
        let text = r#"} ] {"a":1}"#;
        let mut cursor = StreamCursor::new(0);
        assert_eq!(feed(text, &mut cursor), vec![r#"{"a":1}"#]);
    }

    #[test]
    fn test_malformed_object_is_still_framed() {
        let text = r#"{"a":,}"#;
        let mut cursor = StreamCursor::new(0);
        assert_eq!(feed(text, &mut cursor), vec![text]);
    }

    #[test]
    fn test_unterminated_string_does_not_swallow_later_objects() {
        let text = r#"{"v":"oops},{"type":"result","partition":1},{"type":"result","partition":2}"#;
        let mut cursor = StreamCursor::new(0);

        assert_eq!(
            feed(text, &mut cursor),
            vec![
                r#"{"v":"oops}"#,
                r#"{"type":"result","partition":1}"#,
                r#"{"type":"result","partition":2}"#,
            ]
        );
        assert!(!cursor.is_mid_object());
        assert_eq!(cursor.consumed_up_to(), text.len());
    }

    #[test]
    fn test_unterminated_string_recovers_across_chunks() {
        let full = r#"{"v":"oops},{"a":1},{"b":2}"#;
        let mut cursor = StreamCursor::new(0);
        let mut emitted = Vec::new();

        for end in 1..=full.len() {
            emitted.extend(feed(&full[..end], &mut cursor));
        }
        assert_eq!(emitted, vec![r#"{"v":"oops}"#, r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn test_raw_newline_in_string_resyncs() {
        let text = "{\"v\":\"line\n},{\"a\":1}";
        let mut cursor = StreamCursor::new(0);
        assert_eq!(feed(text, &mut cursor), vec!["{\"v\":\"line\n}", r#"{"a":1}"#]);
    }

    #[test]
    fn test_multibyte_text() {
        let text = r#"{"k":"ключ"},{"k":"🔑"}"#;
        let mut cursor = StreamCursor::new(0);
        assert_eq!(feed(text, &mut cursor), vec![r#"{"k":"ключ"}"#, r#"{"k":"🔑"}"#]);
    }

    #[test]
    fn test_shorter_text_than_prefix() {
        let mut cursor = StreamCursor::new(PREFIX.len());
        assert!(feed("[{", &mut cursor).is_empty());
        assert_eq!(cursor.consumed_up_to(), PREFIX.len());
    }

    #[test]
    fn test_lazy_iteration_resumes() {
        let text = r#"{"a":1}{"b":2}{"c":3}"#;
        let mut cursor = StreamCursor::new(0);

        let first = frames(text, &mut cursor).next();
        assert_eq!(first, Some(r#"{"a":1}"#));
        assert_eq!(feed(text, &mut cursor), vec![r#"{"b":2}"#, r#"{"c":3}"#]);
    }
}
