use crate::diagnostics::{DiagnosticCode, Diagnostics};
use serde_json::Value;

const DEFAULT_KEYWORDS: [&str; 5] = ["password", "secret", "key", "token", "api_key"];
const DEFAULT_MIN_LENGTH: usize = 10;

/// Flags string values stored under secret-looking keys.
///
/// A key matches when its lowercase form contains one of the keywords; the value
/// is flagged when it is a string longer than `min_length` characters. Findings
/// are warnings only and never block a compile.
#[derive(Debug, Clone)]
pub struct SecretScanner {
    keywords: Vec<String>,
    min_length: usize,
}

impl Default for SecretScanner {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            min_length: DEFAULT_MIN_LENGTH,
        }
    }
}

impl SecretScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyword(mut self, keyword: &str) -> Self {
        self.keywords.push(keyword.to_lowercase());
        self
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn is_sensitive_key(&self, key: &str) -> bool {
        let lowered = key.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// Walks `doc` and emits a `POTENTIAL_SECRET` warning per finding.
    ///
    /// `exec` blocks are skipped: they repeat the configuration above them.
    pub fn scan(&self, doc: &Value, diagnostics: &mut Diagnostics) {
        self.walk(doc, "", diagnostics);
    }

    fn walk(&self, value: &Value, path: &str, diagnostics: &mut Diagnostics) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    if key == "exec" {
                        continue;
                    }
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };
                    if self.is_sensitive_key(key) {
                        self.check_value(key, child, &child_path, diagnostics);
                    }
                    self.walk(child, &child_path, diagnostics);
                }
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.walk(item, &format!("{}[{}]", path, i), diagnostics);
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        }
    }

    fn check_value(&self, key: &str, value: &Value, path: &str, diagnostics: &mut Diagnostics) {
        let Value::String(text) = value else {
            return;
        };
        if text.chars().count() <= self.min_length || is_bare_placeholder(text) {
            return;
        }
        diagnostics.add_warning(
            DiagnosticCode::PotentialSecret,
            path,
            format!("Field '{}' looks like an inline secret", key),
            Some("Store credentials in a connection instead of the workflow".to_string()),
        );
    }
}

fn is_bare_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with("{{") && trimmed.ends_with("}}") && trimmed.matches("{{").count() == 1
}
