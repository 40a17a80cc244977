//! Response shape detection from a fixed prefix.

/// Prefix of a server-reported error body.
pub const ERROR_SENTINEL: &str = r#"{"error":"#;

/// Prefix of a streaming body: the array opening and its leading marker object.
pub const STREAM_SENTINEL: &str = r#"[{"type":"pioneer"}"#;

/// Overall shape of a search response, decided once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// A single JSON object with an `error` key.
    ErrorBody,
    /// An open JSON array of objects, appended to over time.
    StreamingBody,
    /// Anything else, forwarded verbatim.
    RawBody,
}

impl ResponseShape {
    /// Classify the start of a response.
    ///
    /// Returns `None` while the text is empty or still a strict prefix of a
    /// sentinel, i.e. while more bytes could change the answer.
    #[must_use]
    pub fn classify(text: &str) -> Option<Self> {
        if text.starts_with(ERROR_SENTINEL) {
            Some(Self::ErrorBody)
        } else if text.starts_with(STREAM_SENTINEL) {
            Some(Self::StreamingBody)
        } else if ERROR_SENTINEL.starts_with(text) || STREAM_SENTINEL.starts_with(text) {
            None
        } else {
            Some(Self::RawBody)
        }
    }

    /// Classify a response that will not grow any more.
    #[must_use]
    pub fn classify_final(text: &str) -> Self {
        Self::classify(text).unwrap_or(Self::RawBody)
    }

    /// Bytes of the body already accounted for by the sentinel.
    #[must_use]
    pub const fn framing_prefix_len(self) -> usize {
        match self {
            Self::StreamingBody => STREAM_SENTINEL.len(),
            Self::ErrorBody | Self::RawBody => 0,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ErrorBody => "error",
            Self::StreamingBody => "streaming",
            Self::RawBody => "raw",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"error":"topic not found"}"#, Some(ResponseShape::ErrorBody))]
    #[case(r#"[{"type":"pioneer"}"#, Some(ResponseShape::StreamingBody))]
    #[case(r#"[{"type":"pioneer"},{"type":"result"}"#, Some(ResponseShape::StreamingBody))]
    #[case("not json at all", Some(ResponseShape::RawBody))]
    #[case(r#"{"results":[]}"#, Some(ResponseShape::RawBody))]
    #[case("", None)]
    #[case("[", None)]
    #[case(r#"[{"type":"pio"#, None)]
    #[case(r#"{"err"#, None)]
    #[case("{", None)]
    fn test_classify(#[case] text: &str, #[case] expected: Option<ResponseShape>) {
        assert_eq!(ResponseShape::classify(text), expected);
    }

    #[test]
    fn test_classify_final_defaults_to_raw() {
        assert_eq!(ResponseShape::classify_final("["), ResponseShape::RawBody);
        assert_eq!(ResponseShape::classify_final(""), ResponseShape::RawBody);
    }

    #[test]
    fn test_prefix_len() {
        assert_eq!(ResponseShape::StreamingBody.framing_prefix_len(), 19);
        assert_eq!(ResponseShape::ErrorBody.framing_prefix_len(), 0);
    }
}
