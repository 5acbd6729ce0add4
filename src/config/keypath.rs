//! Dotted key-path traversal over a JSON document.

use serde_json::{Map, Value};

/// Split `a.b.c` into trimmed, non-empty segments.
pub fn split(key: &str) -> Vec<&str> {
    key.split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Walk `segments` down from `doc`.
///
/// Returns `None` as soon as a segment is missing or an intermediate node
/// is not an object. An empty path yields the document itself.
pub fn lookup<'a>(doc: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(doc, |node, seg| node.as_object()?.get(*seg))
}

/// Store `value` at `segments`, creating objects along the way.
///
/// Any non-object node met on the way (including the root) is replaced
/// with a fresh object.
pub fn assign(doc: &mut Value, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *doc = value;
        return;
    };

    let mut node = doc;
    for seg in parents {
        node = ensure_object(node)
            .entry((*seg).to_string())
            .or_insert(Value::Null);
    }
    ensure_object(node).insert((*last).to_string(), value);
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}
