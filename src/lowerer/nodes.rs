use super::graph::{GraphState, RefKind};
use crate::context::{CatalogHit, CatalogIndex};
use crate::document::{
    Action, ActionNode, InputTemplate, NodeData, NodeType, Trigger, TriggerKind, TriggerNode,
};

pub(super) fn lower_trigger(trigger: &Trigger, catalog: Option<&CatalogIndex>, state: &mut GraphState) {
    let Some(exec) = &trigger.exec else {
        return;
    };
    let hit = catalog.and_then(|c| c.trigger(&trigger.toolkit_slug, &trigger.trigger_ref));

    let kind = if trigger.is_scheduled() {
        TriggerKind::ScheduleBased
    } else {
        TriggerKind::EventBased
    };
    let data = TriggerNode {
        kind,
        provider: exec.provider.clone(),
        toolkit: trigger.toolkit_slug.clone(),
        trigger: exec.trigger_slug.clone(),
        connection_id: exec.connection_id.clone(),
        configuration: exec.configuration.clone(),
        trigger_instance_id: exec.trigger_instance_id.clone(),
        delivery: trigger.delivery.clone(),
        schedule: trigger.schedule.clone(),
    };

    let label = entity_label(
        trigger.name.as_deref(),
        hit,
        &trigger.toolkit_slug,
        &exec.trigger_slug,
    );
    let id = state.ids.next_node(NodeType::Trigger);
    state.index.insert(RefKind::Trigger, &trigger.local_id, &id);
    state.push_node(id, NodeData::Trigger(data), &label, entity_icon(hit));
}

pub(super) fn lower_action(action: &Action, catalog: Option<&CatalogIndex>, state: &mut GraphState) {
    let Some(exec) = &action.exec else {
        return;
    };
    let hit = catalog.and_then(|c| c.action(&action.toolkit_slug, &action.action_ref));

    let data = ActionNode {
        provider: exec.provider.clone(),
        tool: action.toolkit_slug.clone(),
        action: exec.action_slug.clone(),
        connection_id: exec.connection_id.clone(),
        input_template: InputTemplate {
            required: exec.required_inputs.clone(),
            optional: exec.optional_inputs.clone(),
        },
        output_vars: action.output_vars.clone().unwrap_or_default(),
        retry: exec.retry.clone(),
        timeout_ms: exec.timeout_ms,
        rate_limit: exec.rate_limit.clone(),
    };

    let label = entity_label(
        action.name.as_deref(),
        hit,
        &action.toolkit_slug,
        &exec.action_slug,
    );
    let id = state.ids.next_node(NodeType::Action);
    state.index.insert(RefKind::Action, &action.local_id, &id);
    state.push_node(id, NodeData::Action(data), &label, entity_icon(hit));
}

/// The entity's own name, then the catalog name, then `"toolkit: slug"`.
fn entity_label(name: Option<&str>, hit: Option<&CatalogHit>, toolkit: &str, slug: &str) -> String {
    name.map(str::to_string)
        .or_else(|| hit.and_then(|h| h.entry.name.clone()))
        .unwrap_or_else(|| format!("{}: {}", toolkit, slug))
}

fn entity_icon(hit: Option<&CatalogHit>) -> Option<String> {
    hit.and_then(|h| h.entry.icon.clone().or_else(|| h.toolkit_icon.clone()))
}
