//! Dot-path access into untyped JSON documents.

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use serde_json::{Map, Value};

/// Looks up `a.b.c` in `doc`. Numeric segments index into arrays.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(doc);
    }
    path.split('.').try_fold(doc, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Like [`get_path`], falling back to `default` when the path is absent.
pub fn get_path_or(doc: &Value, path: &str, default: Value) -> Value {
    get_path(doc, path).cloned().unwrap_or(default)
}

/// Writes `value` at `a.b.c`, creating intermediate maps as needed.
///
/// An intermediate that exists but is not a map is replaced by an empty map.
pub fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = doc;

    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };

        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Checks that every field in `fields` is present (and not null) in `doc`.
///
/// Emits `MISSING_REQUIRED_FIELD` and returns `false` on the first missing one.
pub fn validate_required_fields(
    doc: &Value,
    fields: &[&str],
    path: &str,
    diagnostics: &mut Diagnostics,
) -> bool {
    for field in fields {
        let present = get_path(doc, field).is_some_and(|v| !v.is_null());
        if !present {
            let location = if path.is_empty() {
                field.to_string()
            } else {
                format!("{}.{}", path, field)
            };
            diagnostics.add_error(
                DiagnosticCode::MissingRequiredField,
                location,
                format!("Required field '{}' is missing", field),
                None,
            );
            return false;
        }
    }
    true
}
