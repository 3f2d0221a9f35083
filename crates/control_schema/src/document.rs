//! Dot-path helpers over the nested JSON state document.

use serde_json::{Map, Value};

use crate::descriptor::ControlCatalog;

/// Flattens nested objects into dot-delimited paths. Any non-object value,
/// arrays included, is a leaf and is kept whole.
pub fn flatten_update(payload: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(&mut flat, payload, "");
    flat
}

fn flatten_into(flat: &mut Map<String, Value>, node: &Map<String, Value>, prefix: &str) {
    for (key, value) in node {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(child) => flatten_into(flat, child, &path),
            leaf => {
                flat.insert(path, leaf.clone());
            }
        }
    }
}

/// Reads the value at `path`, if every segment resolves.
pub fn get_path<'a>(document: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let (parents, leaf) = split_leaf(path);
    let mut node = document;
    for segment in parents {
        node = node.get(segment)?.as_object()?;
    }
    node.get(leaf)
}

/// Writes `value` at `path`, creating intermediate objects. A non-object
/// found on the way is replaced by an empty object.
pub fn set_path(document: &mut Map<String, Value>, path: &str, value: Value) {
    let (parents, leaf) = split_leaf(path);
    let mut node = document;
    for segment in parents {
        let slot = node
            .entry(segment)
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(child) = slot else {
            return;
        };
        node = child;
    }
    node.insert(leaf.to_string(), value);
}

/// Removes the value at `path`. Returns whether anything was removed.
pub fn delete_path(document: &mut Map<String, Value>, path: &str) -> bool {
    let (parents, leaf) = split_leaf(path);
    let mut node = document;
    for segment in parents {
        match node.get_mut(segment) {
            Some(Value::Object(child)) => node = child,
            _ => return false,
        }
    }
    node.shift_remove(leaf).is_some()
}

fn split_leaf(path: &str) -> (impl Iterator<Item = &str> + '_, &str) {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };
    (parents.into_iter().flat_map(|parents| parents.split('.')), leaf)
}

/// Deep-merges a stored document onto the defaults template.
///
/// Keys present in the defaults come first, recursively merged with the
/// stored value; stored keys unknown to the defaults are kept after them.
/// A stored non-object where the defaults hold an object, or a stored
/// `null`, falls back to the default. Any other stored leaf wins.
pub fn merge_state(defaults: &Value, current: &Value) -> Value {
    match (defaults, current) {
        (Value::Object(defaults), Value::Object(current)) => {
            Value::Object(merge_document(defaults, current))
        }
        (Value::Object(_), _) | (_, Value::Null) => defaults.clone(),
        (_, current) => current.clone(),
    }
}

pub fn merge_document(
    defaults: &Map<String, Value>,
    current: &Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = Map::with_capacity(defaults.len().max(current.len()));
    for (key, default_value) in defaults {
        let value = match current.get(key) {
            Some(stored) => merge_state(default_value, stored),
            None => default_value.clone(),
        };
        merged.insert(key.clone(), value);
    }
    for (key, value) in current {
        if !merged.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Deletes the source `path` of every aliased control so a value lives only
/// under its `maps_to` target. Returns the paths that were removed.
pub fn prune_mapped_entries(
    document: &mut Map<String, Value>,
    catalog: &ControlCatalog,
) -> Vec<String> {
    catalog
        .aliases()
        .filter_map(|(path, _)| delete_path(document, path).then(|| path.to_string()))
        .collect()
}

#[cfg(test)]
#[path = "tests/document_tests.rs"]
mod tests;
