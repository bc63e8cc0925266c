//! Catalog resolution of individual triggers and actions.
//!
//! A failure here is contained to the entity: it is reported, the entity is left
//! without an `exec` block, and the caller moves on to the next one.

use super::coercion::{coerce_param, normalize_params};
use super::policy::resolve_action_policy;
use crate::context::{CatalogHit, CompileContext};
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::document::{Action, ActionExec, Trigger, TriggerExec, Version};
use crate::shared::hash_trigger_instance;
use itertools::Itertools;
use serde_json::{Map, Value};

pub(super) fn resolve_trigger(
    trigger: &mut Trigger,
    path: &str,
    workflow_id: &str,
    version: &Version,
    context: &CompileContext,
    diagnostics: &mut Diagnostics,
) {
    let Some(hit) = context
        .index()
        .trigger(&trigger.toolkit_slug, &trigger.trigger_ref)
    else {
        diagnostics.add_error(
            DiagnosticCode::UnknownTrigger,
            path,
            format!(
                "Trigger '{}' not found in toolkit '{}'",
                trigger.trigger_ref, trigger.toolkit_slug
            ),
            Some("Check toolkit_slug and trigger_ref against the catalog".to_string()),
        );
        return;
    };

    if let Some(delivery) = &trigger.delivery {
        if !hit.entry.supports_delivery(delivery) {
            diagnostics.add_error(
                DiagnosticCode::UnsupportedDelivery,
                format!("{}.delivery", path),
                format!(
                    "Delivery '{}' is not supported by trigger '{}'",
                    delivery,
                    hit.entry.display_slug()
                ),
                Some(format!(
                    "Supported: {}",
                    hit.entry.supported_delivery.iter().join(", ")
                )),
            );
            return;
        }
    }

    let Some(connection_id) = connection_for(
        hit,
        trigger.connection_hint.as_deref(),
        path,
        context,
        diagnostics,
    ) else {
        return;
    };

    let configuration = normalize_params(
        &trigger.configuration,
        &hit.entry.param_spec,
        &format!("{}.configuration", path),
        true,
        diagnostics,
    );

    let trigger_instance_id = context
        .user_id()
        .filter(|id| !id.is_empty() && !workflow_id.is_empty())
        .map(|user_id| {
            hash_trigger_instance(user_id, workflow_id, &version.to_string(), &trigger.local_id)
        });

    tracing::debug!(
        local_id = %trigger.local_id,
        provider = %hit.provider,
        connection_id = %connection_id,
        "trigger resolved"
    );
    trigger.exec = Some(TriggerExec {
        provider: hit.provider.clone(),
        trigger_slug: hit.entry.display_slug().to_string(),
        configuration,
        connection_id,
        trigger_instance_id,
    });
}

pub(super) fn resolve_action(
    action: &mut Action,
    path: &str,
    context: &CompileContext,
    diagnostics: &mut Diagnostics,
) {
    let Some(hit) = context
        .index()
        .action(&action.toolkit_slug, &action.action_ref)
    else {
        diagnostics.add_error(
            DiagnosticCode::UnknownAction,
            path,
            format!(
                "Action '{}' not found in toolkit '{}'",
                action.action_ref, action.toolkit_slug
            ),
            Some("Check toolkit_slug and action_ref against the catalog".to_string()),
        );
        return;
    };

    let Some(connection_id) = connection_for(
        hit,
        action.connection_hint.as_deref(),
        path,
        context,
        diagnostics,
    ) else {
        return;
    };

    let (required_inputs, optional_inputs) = split_inputs(action, hit, path, diagnostics);
    let policy = resolve_action_policy(action, &context.defaults, &hit.entry.policy);

    tracing::debug!(
        local_id = %action.local_id,
        provider = %hit.provider,
        connection_id = %connection_id,
        "action resolved"
    );
    action.exec = Some(ActionExec {
        provider: hit.provider.clone(),
        action_slug: hit.entry.display_slug().to_string(),
        connection_id,
        required_inputs,
        optional_inputs,
        retry: policy.retry,
        timeout_ms: policy.timeout_ms,
        rate_limit: policy.rate_limit,
    });
}

fn connection_for(
    hit: &CatalogHit,
    hint: Option<&str>,
    path: &str,
    context: &CompileContext,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    let found = context
        .resolve_connection(&hit.provider, hint)
        .map(str::to_string);
    if found.is_none() {
        diagnostics.add_error(
            DiagnosticCode::MissingConnection,
            path,
            format!("No connection found for provider '{}'", hit.provider),
            Some(format!("Connect a '{}' account first", hit.provider)),
        );
    }
    found
}

/// Builds the exec `required_inputs` and `optional_inputs` of an action.
///
/// A declared required param is looked up in `required_inputs`, then in
/// `optional_inputs` (where it is then removed), then in the catalog default.
fn split_inputs(
    action: &Action,
    hit: &CatalogHit,
    path: &str,
    diagnostics: &mut Diagnostics,
) -> (Map<String, Value>, Map<String, Value>) {
    let spec = &hit.entry.param_spec;
    let mut required = Map::new();
    let mut optional_source = action.optional_inputs.clone();

    for (name, param) in spec.iter().filter(|(_, p)| p.required) {
        let param_path = format!("{}.required_inputs.{}", path, name);
        let supplied = present(action.required_inputs.get(name))
            .cloned()
            .or_else(|| present(optional_source.remove(name).as_ref()).cloned())
            .or_else(|| param.default.clone());

        match supplied {
            Some(value) => {
                let value = coerce_param(&value, param, &param_path, diagnostics);
                required.insert(name.clone(), value);
            }
            None => diagnostics.add_error(
                DiagnosticCode::MissingRequiredParam,
                param_path,
                format!("Required parameter '{}' has no value", name),
                Some(format!(
                    "Provide '{}' in required_inputs or through an answer",
                    name
                )),
            ),
        }
    }

    for (name, value) in &action.required_inputs {
        // Declared required params were settled above.
        if required.contains_key(name) || spec.get(name).is_some_and(|p| p.required) {
            continue;
        }
        let value = match spec.get(name) {
            Some(param) => coerce_param(
                value,
                param,
                &format!("{}.required_inputs.{}", path, name),
                diagnostics,
            ),
            None => value.clone(),
        };
        required.insert(name.clone(), value);
    }

    let optional = normalize_params(
        &optional_source,
        spec,
        &format!("{}.optional_inputs", path),
        false,
        diagnostics,
    );
    (required, optional)
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}
