//! Safe `{{key}}` substitution.
//!
//! Substitution is purely textual: a token is replaced by the answer's text and
//! nothing is ever evaluated. The scan is single-pass, so text inserted by an
//! answer is never scanned again and cannot expand into further placeholders.

use serde_json::{Map, Value};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Replaces every `{{key}}` token whose key exists in `answers`.
///
/// Unknown keys are left verbatim; they are not an error at this level.
pub fn render_placeholder(template: &str, answers: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = &after[..end];
        if key.contains(OPEN) {
            // `{{a {{b}}`: the outer braces are literal text, keep scanning from the inner token.
            out.push_str(OPEN);
            rest = after;
            continue;
        }

        match answers.get(key) {
            Some(value) => out.push_str(&answer_text(value)),
            None => {
                out.push_str(OPEN);
                out.push_str(key);
                out.push_str(CLOSE);
            }
        }
        rest = &after[end + CLOSE.len()..];
    }

    out.push_str(rest);
    out
}

/// Substitutes placeholders in every string leaf of `doc`, in place.
pub fn apply_answers(doc: &mut Value, answers: &Map<String, Value>) {
    match doc {
        Value::String(s) => {
            if s.contains(OPEN) {
                *s = render_placeholder(s, answers);
            }
        }
        Value::Array(items) => {
            for item in items {
                apply_answers(item, answers);
            }
        }
        Value::Object(map) => {
            for value in map.values_mut() {
                apply_answers(value, answers);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Keys of the `{{key}}` tokens still present in `text`.
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            break;
        };
        let key = &after[..end];
        if key.contains(OPEN) {
            rest = after;
            continue;
        }
        keys.push(key.to_string());
        rest = &after[end + CLOSE.len()..];
    }
    keys
}

fn answer_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
