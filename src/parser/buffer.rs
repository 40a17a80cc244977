//! Growing response text assembled from byte chunks.

use bytes::{Buf, BytesMut};

/// Cumulative response text.
///
/// Network chunks can split a multi-byte UTF-8 character; the incomplete
/// tail is held back until the rest arrives. Invalid sequences become
/// U+FFFD. The text only ever grows.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    text: String,
    pending: BytesMut,
    bytes_received: u64,
}

impl StreamBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk; returns how many bytes of text became available.
    pub fn push(&mut self, chunk: &[u8]) -> usize {
        self.bytes_received += chunk.len() as u64;
        self.pending.extend_from_slice(chunk);

        let before = self.text.len();
        let consumed = decode_into(&self.pending, &mut self.text);
        self.pending.advance(consumed);

        self.text.len() - before
    }

    /// Flush a dangling partial character at end of stream.
    pub fn finish(&mut self) {
        if !self.pending.is_empty() {
            self.pending.clear();
            self.text.push(char::REPLACEMENT_CHARACTER);
        }
    }

    /// Text received so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length of the text in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether no text has arrived yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Raw bytes received, including any held-back partial character.
    #[must_use]
    pub const fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}

/// Decode as much of `input` as possible; returns the bytes consumed.
fn decode_into(mut input: &[u8], out: &mut String) -> usize {
    let total = input.len();

    loop {
        match std::str::from_utf8(input) {
            Ok(valid) => {
                out.push_str(valid);
                return total;
            }
            Err(e) => {
                let (valid, rest) = input.split_at(e.valid_up_to());
                out.push_str(&String::from_utf8_lossy(valid));

                match e.error_len() {
                    Some(bad) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        input = &rest[bad..];
                    }
                    // Incomplete character at the end: wait for more bytes.
                    None => return total - rest.len(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_chunks() {
        let mut buffer = StreamBuffer::new();
        assert_eq!(buffer.push(b"[{\"type\""), 8);
        assert_eq!(buffer.push(b":\"pioneer\"}"), 11);
        assert_eq!(buffer.as_str(), r#"[{"type":"pioneer"}"#);
    }

    #[test]
    fn test_split_multibyte_character() {
        let bytes = "ключ".as_bytes();
        let mut buffer = StreamBuffer::new();

        assert_eq!(buffer.push(&bytes[..3]), 2);
        assert_eq!(buffer.as_str(), "к");
        assert_eq!(buffer.push(&bytes[3..]), 6);
        assert_eq!(buffer.as_str(), "ключ");
        assert_eq!(buffer.bytes_received(), 8);
    }

    #[test]
    fn test_invalid_bytes_replaced() {
        let mut buffer = StreamBuffer::new();
        buffer.push(b"a\xffb");
        assert_eq!(buffer.as_str(), "a\u{FFFD}b");
    }

    #[test]
    fn test_finish_flushes_partial() {
        let mut buffer = StreamBuffer::new();
        buffer.push(&"é".as_bytes()[..1]);
        assert!(buffer.is_empty());

        buffer.finish();
        assert_eq!(buffer.as_str(), "\u{FFFD}");
    }
}
