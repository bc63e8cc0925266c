use super::coercion::coerce_value;
use crate::context::ParamType;
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::document::{Action, DEFAULT_TIMEOUT_MS, Policies, RateLimit, RetryPolicy};
use crate::error::CoercionError;
use serde_json::Value;

/// The effective retry, timeout and rate limit of one action.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedPolicy {
    pub retry: RetryPolicy,
    pub timeout_ms: u64,
    pub rate_limit: RateLimit,
}

/// Each field independently takes the first value found in: the action itself,
/// the context defaults, the catalog entry's policy, the built-in fallback.
pub(crate) fn resolve_action_policy(
    action: &Action,
    defaults: &Policies,
    catalog: &Policies,
) -> ResolvedPolicy {
    let retry = action
        .retry
        .as_ref()
        .or(defaults.retry.as_ref())
        .or(catalog.retry.as_ref())
        .cloned()
        .unwrap_or_default();
    let timeout_ms = action
        .timeout_ms
        .or(defaults.timeout_ms)
        .or(catalog.timeout_ms)
        .unwrap_or(DEFAULT_TIMEOUT_MS);
    let rate_limit = action
        .rate_limit
        .as_ref()
        .or(defaults.rate_limit.as_ref())
        .or(catalog.rate_limit.as_ref())
        .cloned()
        .unwrap_or_default();

    ResolvedPolicy {
        retry,
        timeout_ms,
        rate_limit,
    }
}

#[derive(Debug, Clone, Copy)]
enum NumericKind {
    U32,
    U64,
    F64,
}

impl NumericKind {
    fn coerce(self, value: &Value) -> Result<Value, CoercionError> {
        let (max, expected) = match self {
            NumericKind::F64 => return coerce_value(value, ParamType::Number),
            NumericKind::U32 => (u64::from(u32::MAX), "unsigned 32-bit integer"),
            NumericKind::U64 => (u64::MAX, "unsigned integer"),
        };
        let coerced = coerce_value(value, ParamType::Integer)?;
        match coerced.as_u64() {
            Some(n) if n <= max => Ok(coerced),
            _ => Err(CoercionError {
                expected,
                found: value.clone(),
            }),
        }
    }
}

const RETRY_FIELDS: [(&str, NumericKind); 3] = [
    ("max_attempts", NumericKind::U32),
    ("backoff_multiplier", NumericKind::F64),
    ("initial_delay_ms", NumericKind::U64),
];
const RATE_LIMIT_FIELDS: [(&str, NumericKind); 1] = [("requests_per_minute", NumericKind::U32)];
const LOOP_FIELDS: [(&str, NumericKind); 2] = [
    ("max_iterations", NumericKind::U32),
    ("max_concurrency", NumericKind::U32),
];

const NEXT_SOURCE_HINT: &str = "The next policy source applies";
const LOOP_DEFAULT_HINT: &str = "The loop default applies";

/// Coerces policy and loop numbers that arrived as text, in place.
///
/// A value that cannot be coerced is warned about and removed, so the field falls
/// through to the next source (context defaults, catalog, built-in). A bad retry
/// or rate-limit sub-field drops the whole override.
pub(crate) fn coerce_policy_numbers(working: &mut Value, diagnostics: &mut Diagnostics) {
    if let Some(Value::Array(actions)) = working.get_mut("actions") {
        for (i, action) in actions.iter_mut().enumerate() {
            let path = format!("actions[{}]", i);
            coerce_policy_set(action, &path, &[("timeout_ms", NumericKind::U64)], diagnostics);
        }
    }
    if let Some(policies) = working.get_mut("policies") {
        let scalars = [
            ("timeout_ms", NumericKind::U64),
            ("max_parallelism", NumericKind::U32),
        ];
        coerce_policy_set(policies, "policies", &scalars, diagnostics);
    }
    if let Some(Value::Array(loops)) = working.pointer_mut("/flow_control/loops") {
        for (i, block) in loops.iter_mut().enumerate() {
            let path = format!("flow_control.loops[{}]", i);
            for (field, kind) in LOOP_FIELDS {
                if !coerce_field(block, field, kind, &path, LOOP_DEFAULT_HINT, diagnostics) {
                    remove_field(block, field);
                }
            }
        }
    }
}

fn coerce_policy_set(
    container: &mut Value,
    path: &str,
    scalars: &[(&str, NumericKind)],
    diagnostics: &mut Diagnostics,
) {
    for (field, kind) in scalars {
        if !coerce_field(container, field, *kind, path, NEXT_SOURCE_HINT, diagnostics) {
            remove_field(container, field);
        }
    }
    coerce_policy_object(container, "retry", &RETRY_FIELDS, path, diagnostics);
    coerce_policy_object(container, "rate_limit", &RATE_LIMIT_FIELDS, path, diagnostics);
}

fn coerce_policy_object(
    container: &mut Value,
    field: &str,
    fields: &[(&str, NumericKind)],
    path: &str,
    diagnostics: &mut Diagnostics,
) {
    let Some(value) = container.get_mut(field) else {
        return;
    };
    let object_path = format!("{}.{}", path, field);

    let valid = if value.is_null() {
        true
    } else if value.is_object() {
        let mut valid = true;
        for (name, kind) in fields {
            valid &= coerce_field(value, name, *kind, &object_path, NEXT_SOURCE_HINT, diagnostics);
        }
        valid
    } else {
        let err = CoercionError {
            expected: "object",
            found: value.clone(),
        };
        warn_coercion(&object_path, &err, NEXT_SOURCE_HINT, diagnostics);
        false
    };

    if !valid {
        remove_field(container, field);
    }
}

/// Returns `false` when the field is present but could not be coerced.
fn coerce_field(
    container: &mut Value,
    field: &str,
    kind: NumericKind,
    path: &str,
    hint: &str,
    diagnostics: &mut Diagnostics,
) -> bool {
    let Some(value) = container.get_mut(field) else {
        return true;
    };
    if value.is_null() {
        return true;
    }
    match kind.coerce(value) {
        Ok(coerced) => {
            *value = coerced;
            true
        }
        Err(err) => {
            warn_coercion(&format!("{}.{}", path, field), &err, hint, diagnostics);
            false
        }
    }
}

fn warn_coercion(path: &str, err: &CoercionError, hint: &str, diagnostics: &mut Diagnostics) {
    diagnostics.add_warning(
        DiagnosticCode::ParamCoercionFailed,
        path,
        err.to_string(),
        Some(hint.to_string()),
    );
}

fn remove_field(container: &mut Value, field: &str) {
    if let Some(map) = container.as_object_mut() {
        map.remove(field);
    }
}
