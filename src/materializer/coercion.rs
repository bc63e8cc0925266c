use crate::context::{ParamSpec, ParamType};
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::error::CoercionError;
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

const TRUE_WORDS: [&str; 4] = ["true", "1", "yes", "on"];

/// Converts `value` to the JSON representation of `param_type`.
///
/// `string`, `object` and untyped params pass through unchanged, as does a
/// non-string value declared as `array`. Booleans never fail.
pub fn coerce_value(value: &Value, param_type: ParamType) -> Result<Value, CoercionError> {
    match param_type {
        ParamType::Number => to_f64(value)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| mismatch("number", value)),
        ParamType::Integer => to_i64(value)
            .map(Value::from)
            .ok_or_else(|| mismatch("integer", value)),
        ParamType::Boolean => Ok(Value::Bool(truthy(value))),
        ParamType::Array => Ok(match value {
            Value::String(s) => Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            ),
            other => other.clone(),
        }),
        ParamType::String | ParamType::Object | ParamType::Any => Ok(value.clone()),
    }
}

/// Coerces one param, keeping the original value and warning on failure.
pub(crate) fn coerce_param(
    value: &Value,
    spec: &ParamSpec,
    path: &str,
    diagnostics: &mut Diagnostics,
) -> Value {
    match coerce_value(value, spec.param_type) {
        Ok(coerced) => coerced,
        Err(err) => {
            diagnostics.add_warning(
                DiagnosticCode::ParamCoercionFailed,
                path,
                err.to_string(),
                Some("The original value was kept".to_string()),
            );
            value.clone()
        }
    }
}

/// Coerces every declared key of `params`; undeclared keys pass through.
///
/// With `fill_defaults`, declared params missing from `params` are added with
/// their catalog default when one exists.
pub(crate) fn normalize_params(
    params: &Map<String, Value>,
    spec: &IndexMap<String, ParamSpec>,
    path: &str,
    fill_defaults: bool,
    diagnostics: &mut Diagnostics,
) -> Map<String, Value> {
    let mut normalized = Map::new();
    for (name, value) in params {
        let value = match spec.get(name) {
            Some(param) => coerce_param(value, param, &format!("{}.{}", path, name), diagnostics),
            None => value.clone(),
        };
        normalized.insert(name.clone(), value);
    }

    if fill_defaults {
        for (name, param) in spec {
            if normalized.contains_key(name) {
                continue;
            }
            if let Some(default) = &param.default {
                normalized.insert(name.clone(), default.clone());
            }
        }
    }
    normalized
}

fn to_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            // Truncation toward zero; out-of-range floats are rejected.
            (f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64)
                .then(|| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => {
            let lowered = s.trim().to_lowercase();
            TRUE_WORDS.contains(&lowered.as_str())
        }
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn mismatch(expected: &'static str, found: &Value) -> CoercionError {
    CoercionError {
        expected,
        found: found.clone(),
    }
}
