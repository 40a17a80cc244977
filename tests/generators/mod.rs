//! Synthetic search response bodies.

#![allow(dead_code)]

use serde_json::json;

/// Leading text of every streaming body.
pub const PIONEER: &str = r#"[{"type":"pioneer"}"#;

/// A result object as the server serializes it.
pub fn result_object(partition: i32, offset: i64, value: &str) -> String {
    json!({
        "type": "result",
        "partition": partition,
        "offset": offset,
        "timestamp": 1_500_000_000_000_i64 + offset,
        "key": format!("key-{offset}"),
        "value": value,
    })
    .to_string()
}

/// A scan position report that is not a result.
pub fn position_object(partition: i32, offset: i64) -> String {
    json!({
        "type": "partition-position",
        "partition": partition,
        "offset": offset,
    })
    .to_string()
}

/// A complete streaming body holding `objects`.
pub fn streaming_body(objects: &[String]) -> String {
    let mut body = String::from(PIONEER);
    for object in objects {
        body.push(',');
        body.push_str(object);
    }
    body.push(']');
    body
}

/// Every prefix of `body` ending at `cuts`, followed by the whole body.
pub fn snapshots(body: &str, cuts: &[usize]) -> Vec<String> {
    let mut out: Vec<String> = cuts
        .iter()
        .filter_map(|&cut| body.get(..cut))
        .map(str::to_string)
        .collect();
    out.push(body.to_string());
    out
}
