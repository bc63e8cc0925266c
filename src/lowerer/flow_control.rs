//! Lowering of conditions, parallel blocks, loops, routes and `depends_on`.
//!
//! Node ids for every block are reserved and indexed before any block is built,
//! so a condition may point at a loop or a parallel join declared after it.

use super::graph::{GraphState, RefKind};
use crate::diagnostics::DiagnosticCode;
use crate::document::{
    Action, Conditional, DEFAULT_WHEN, FlowControl, ForeachLoop, GatewayBranch, GatewayNode,
    JoinMode, JoinNode, LoopBlock, LoopForeachNode, LoopWhileNode, NodeData, NodeType,
    ParallelBlock, ParallelNode, WhileLoop,
};

const DEFAULT_MAX_ITERATIONS: u32 = 1000;
const DEFAULT_MAX_CONCURRENCY: u32 = 5;
const DEFAULT_ITEM_VAR: &str = "item";
const DEFAULT_INDEX_VAR: &str = "index";

const BRANCH_LABEL: &str = "parallel_branch";
const LOOP_BODY_LABEL: &str = "loop_body";
const ELSE_LABEL: &str = "else";

/// Ids reserved for each block, in declaration order.
struct Reserved {
    gateways: Vec<String>,
    parallels: Vec<(String, String)>,
    loops: Vec<String>,
}

/// Lowers all flow-control blocks and routes.
///
/// Returns `false` when a route end could not be resolved. Every route is still
/// processed first so the report lists all of them.
pub(super) fn lower_flow_control(flow: &FlowControl, state: &mut GraphState) -> bool {
    let reserved = reserve(flow, state);

    for (i, (conditional, id)) in flow.conditions.iter().zip(reserved.gateways).enumerate() {
        lower_conditional(conditional, id, &format!("flow_control.conditions[{}]", i), state);
    }
    for (i, (block, (par_id, join_id))) in flow
        .parallel_execution
        .iter()
        .zip(reserved.parallels)
        .enumerate()
    {
        let path = format!("flow_control.parallel_execution[{}]", i);
        lower_parallel(block, par_id, join_id, &path, state);
    }
    for (i, (block, id)) in flow.loops.iter().zip(reserved.loops).enumerate() {
        lower_loop(block, id, &format!("flow_control.loops[{}]", i), state);
    }

    lower_routes(flow, state)
}

fn reserve(flow: &FlowControl, state: &mut GraphState) -> Reserved {
    let gateways = flow
        .conditions
        .iter()
        .map(|conditional| {
            let id = state.ids.next_node(NodeType::GatewayIf);
            if let Some(local_id) = &conditional.local_id {
                state.index.insert(RefKind::Gateway, local_id, &id);
            }
            id
        })
        .collect();

    let parallels = flow
        .parallel_execution
        .iter()
        .map(|block| {
            let par_id = state.ids.next_node(NodeType::Parallel);
            let join_id = state.ids.next_node(NodeType::Join);
            if let Some(local_id) = &block.local_id {
                state.index.insert(RefKind::Parallel, local_id, &par_id);
            }
            if let Some(join_key) = block.join_key() {
                state.index.insert(RefKind::Join, &join_key, &join_id);
            }
            (par_id, join_id)
        })
        .collect();

    let loops = flow
        .loops
        .iter()
        .map(|block| {
            let node_type = match block {
                LoopBlock::While(_) => NodeType::LoopWhile,
                LoopBlock::Foreach(_) => NodeType::LoopForeach,
            };
            let id = state.ids.next_node(node_type);
            if let Some(local_id) = block.local_id() {
                state.index.insert(RefKind::Loop, local_id, &id);
            }
            id
        })
        .collect();

    Reserved {
        gateways,
        parallels,
        loops,
    }
}

fn lower_conditional(conditional: &Conditional, id: String, path: &str, state: &mut GraphState) {
    let branches: Vec<GatewayBranch> = conditional
        .branches
        .iter()
        .enumerate()
        .map(|(j, branch)| GatewayBranch {
            name: branch
                .name
                .clone()
                .unwrap_or_else(|| format!("branch_{}", j + 1)),
            expr: branch.expr.clone(),
            to: state.resolve(&branch.to_ref, &format!("{}.branches[{}].to_ref", path, j)),
        })
        .collect();
    let else_to = conditional
        .else_ref
        .as_deref()
        .and_then(|reference| state.resolve(reference, &format!("{}.else_ref", path)));

    state.wire_incoming(conditional.incoming_ref.as_deref(), &id, path);
    for branch in &branches {
        if let Some(target) = &branch.to {
            let condition = Some(branch.expr.clone());
            state.add_edge(&id, target, None, condition, Some(branch.name.as_str()));
        }
    }
    if let Some(target) = &else_to {
        state.add_edge(&id, target, None, None, Some(ELSE_LABEL));
    }

    let data = NodeData::GatewayIf(GatewayNode { branches, else_to });
    state.push_node(id, data, "If", None);
}

fn lower_parallel(
    block: &ParallelBlock,
    par_id: String,
    join_id: String,
    path: &str,
    state: &mut GraphState,
) {
    let targets: Vec<String> = block
        .branches
        .iter()
        .enumerate()
        .filter_map(|(j, reference)| {
            state.resolve(reference, &format!("{}.branches[{}]", path, j))
        })
        .collect();

    state.wire_incoming(block.incoming_ref.as_deref(), &par_id, path);
    for target in &targets {
        state.add_edge(&par_id, target, Some(DEFAULT_WHEN), None, Some(BRANCH_LABEL));
    }
    if let Some(reference) = &block.outgoing_ref {
        if let Some(target) = state.resolve(reference, &format!("{}.outgoing_ref", path)) {
            state.add_edge(&join_id, &target, None, None, None);
        }
    }

    let fan_out = NodeData::Parallel(ParallelNode {
        branches: targets,
        join: join_id.clone(),
    });
    let join = NodeData::Join(JoinNode {
        mode: JoinMode::All,
        parallel: par_id.clone(),
    });
    state.push_node(par_id, fan_out, "Fan-out", None);
    state.push_node(join_id, join, "Join", None);
}

fn lower_loop(block: &LoopBlock, id: String, path: &str, state: &mut GraphState) {
    let body_start = block
        .body_ref()
        .and_then(|reference| state.resolve(reference, &format!("{}.body_ref", path)));

    state.wire_incoming(block.incoming_ref(), &id, path);
    if let Some(body) = &body_start {
        state.add_edge(&id, body, None, None, Some(LOOP_BODY_LABEL));
    }

    match block {
        LoopBlock::While(WhileLoop {
            condition,
            max_iterations,
            ..
        }) => {
            let data = NodeData::LoopWhile(LoopWhileNode {
                condition: condition.clone(),
                body_start,
                max_iterations: max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            });
            state.push_node(id, data, "While", None);
        }
        LoopBlock::Foreach(ForeachLoop {
            source_array_expr,
            item_var,
            index_var,
            max_concurrency,
            ..
        }) => {
            let data = NodeData::LoopForeach(LoopForeachNode {
                source_array_expr: source_array_expr.clone(),
                item_var: item_var.clone().unwrap_or_else(|| DEFAULT_ITEM_VAR.to_string()),
                index_var: index_var
                    .clone()
                    .unwrap_or_else(|| DEFAULT_INDEX_VAR.to_string()),
                body_start,
                max_concurrency: max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY),
            });
            state.push_node(id, data, "For each", None);
        }
    }
}

fn lower_routes(flow: &FlowControl, state: &mut GraphState) -> bool {
    let mut complete = true;
    for (i, route) in flow.routes.iter().enumerate() {
        let path = format!("flow_control.routes[{}]", i);

        let source = state.resolve(&route.from_ref, &format!("{}.from_ref", path));
        if source.is_none() {
            state.diagnostics.add_error(
                DiagnosticCode::MissingSourceRef,
                format!("{}.from_ref", path),
                format!("Route source '{}' does not exist", route.from_ref),
                None,
            );
        }
        let target = state.resolve(&route.to_ref, &format!("{}.to_ref", path));
        if target.is_none() {
            state.diagnostics.add_error(
                DiagnosticCode::MissingTargetRef,
                format!("{}.to_ref", path),
                format!("Route target '{}' does not exist", route.to_ref),
                None,
            );
        }

        match (source, target) {
            (Some(source), Some(target)) => state.add_edge(
                &source,
                &target,
                route.when.as_deref(),
                route.condition.clone(),
                route.label.as_deref(),
            ),
            _ => complete = false,
        }
    }
    complete
}

/// Turns each `depends_on` entry into a `success` edge from the dependency.
///
/// Edges already present (e.g. from a route) are not duplicated; an unresolved
/// dependency is only warned about.
pub(super) fn lower_dependencies(actions: &[Action], state: &mut GraphState) {
    for (i, action) in actions.iter().enumerate() {
        let Some(depends_on) = &action.depends_on else {
            continue;
        };
        let Some(target) = state.index.lookup(&action.local_id).map(str::to_string) else {
            continue;
        };
        for (j, dependency) in depends_on.iter().enumerate() {
            let path = format!("actions[{}].depends_on[{}]", i, j);
            let Some(source) = state.resolve(dependency, &path) else {
                continue;
            };
            if !state.has_edge(&source, &target, DEFAULT_WHEN) {
                state.add_edge(&source, &target, None, None, None);
            }
        }
    }
}
