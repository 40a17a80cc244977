//! Property-based tests for stream framing and the query link codec.

use kbrowse_client::model::QueryState;
use kbrowse_client::parser::{feed, StreamCursor, STREAM_SENTINEL};
use proptest::prelude::*;
use serde_json::json;

/// String content that stresses the scanner: braces, quotes and escapes.
fn tricky_text() -> impl Strategy<Value = String> {
    "[a-z {}\\[\\]\"\\\\,:é]{0,16}"
}

fn object() -> impl Strategy<Value = String> {
    (any::<i32>(), any::<i64>(), tricky_text(), tricky_text(), any::<bool>()).prop_map(
        |(partition, offset, key, value, nested)| {
            let value = if nested {
                json!({ "inner": { "text": value, "list": [1, { "deep": key.clone() }] } })
            } else {
                json!(value)
            };
            json!({
                "type": "result",
                "partition": partition,
                "offset": offset,
                "key": key,
                "value": value,
            })
            .to_string()
        },
    )
}

/// Text the server may put between objects.
fn separator() -> impl Strategy<Value = String> {
    prop::sample::select(vec![",", ", ", ",\n", " ,\t", ","]).prop_map(str::to_string)
}

fn stream() -> impl Strategy<Value = (Vec<String>, String)> {
    prop::collection::vec((separator(), object()), 0..12).prop_map(|parts| {
        let mut text = String::from(STREAM_SENTINEL);
        let mut objects = Vec::with_capacity(parts.len());
        for (sep, obj) in parts {
            text.push_str(&sep);
            text.push_str(&obj);
            objects.push(obj);
        }
        text.push(']');
        (objects, text)
    })
}

/// Sorted char-boundary cut points within `text`.
fn cut_points(text: &str, raw: &[prop::sample::Index]) -> Vec<usize> {
    let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let mut cuts: Vec<usize> = raw.iter().map(|ix| boundaries[ix.index(boundaries.len())]).collect();
    cuts.sort_unstable();
    cuts.dedup();
    cuts
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Splitting a stream anywhere yields every object once, in order.
    #[test]
    fn framing_reproduces_every_object(
        (objects, text) in stream(),
        raw_cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..20),
    ) {
        let mut cursor = StreamCursor::new(STREAM_SENTINEL.len());
        let mut emitted = Vec::new();

        for cut in cut_points(&text, &raw_cuts) {
            let snapshot = &text[..cut];
            for frame in feed(snapshot, &mut cursor) {
                emitted.push(frame.to_string());
            }
            // Nothing is emitted before it is fully received.
            prop_assert!(cursor.consumed_up_to() <= cut.max(STREAM_SENTINEL.len()));
            prop_assert!(objects.starts_with(&emitted));
        }
        for frame in feed(&text, &mut cursor) {
            emitted.push(frame.to_string());
        }

        prop_assert_eq!(emitted, objects);
        prop_assert!(!cursor.is_mid_object());
    }

    /// Every emitted frame decodes back to the object that was written.
    #[test]
    fn frames_are_valid_json((objects, text) in stream()) {
        let mut cursor = StreamCursor::new(STREAM_SENTINEL.len());
        let frames = feed(&text, &mut cursor);

        prop_assert_eq!(frames.len(), objects.len());
        for (frame, object) in frames.iter().zip(&objects) {
            let decoded: serde_json::Value = serde_json::from_str(frame).unwrap();
            let expected: serde_json::Value = serde_json::from_str(object).unwrap();
            prop_assert_eq!(decoded, expected);
        }
    }

    /// Re-presenting unchanged text emits nothing new.
    #[test]
    fn framing_is_idempotent(
        (_, text) in stream(),
        raw_cut in any::<prop::sample::Index>(),
    ) {
        let cut = cut_points(&text, &[raw_cut])[0];
        let snapshot = &text[..cut];
        let mut cursor = StreamCursor::new(STREAM_SENTINEL.len());

        let _ = feed(snapshot, &mut cursor);
        let after = cursor.clone();

        prop_assert!(feed(snapshot, &mut cursor).is_empty());
        prop_assert!(feed(snapshot, &mut cursor).is_empty());
        prop_assert_eq!(cursor, after);
    }

    /// Arbitrary bytes never make the scanner panic.
    #[test]
    fn framing_never_panics(content in ".*") {
        let mut cursor = StreamCursor::new(0);
        let _ = feed(&content, &mut cursor);
    }

    /// Links round-trip any combination of set and unset fields.
    #[test]
    fn query_link_round_trip(
        servers in "[a-z0-9.:,]{0,24}",
        topic in "[a-zA-Z0-9._-]{0,16}",
        key in proptest::option::of(tricky_text()),
        val_regex in proptest::option::of(tricky_text()),
        relative_offset in proptest::option::of(any::<i64>()),
        follow in any::<bool>(),
        default_partition in any::<bool>(),
        partitions in proptest::option::of("[0-9, ]{1,10}"),
        value_deserializer in proptest::option::of("[a-z-]{1,12}"),
        schema_registry_url in proptest::option::of("http://[a-z]{1,8}:[0-9]{2,4}"),
    ) {
        let mut query = QueryState::new(servers, topic)
            .with_relative_offset(relative_offset)
            .with_follow(follow)
            .with_default_partition(default_partition);
        if let Some(key) = key {
            query = query.with_key(key);
        }
        if let Some(val_regex) = val_regex {
            query = query.with_val_regex(val_regex);
        }
        if let Some(partitions) = partitions {
            query = query.with_partitions(partitions);
        }
        if let Some(name) = value_deserializer {
            query = query.with_value_deserializer(name);
        }
        if let Some(url) = schema_registry_url {
            query = query.with_schema_registry_url(url);
        }

        let decoded = QueryState::decode(&query.encode()).unwrap();
        prop_assert_eq!(decoded, query);
    }
}
