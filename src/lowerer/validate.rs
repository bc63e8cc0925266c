//! Structural checks on a finished DAG.

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::document::{DagDocument, NodeData};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;

/// Returns `false` if any error was emitted. Orphans and unjoined parallel
/// branches are warnings only.
pub(super) fn validate_dag(dag: &DagDocument, diagnostics: &mut Diagnostics) -> bool {
    let before = diagnostics.errors.len();
    let ids: AHashSet<&str> = dag.nodes.iter().map(|n| n.id.as_str()).collect();

    for (i, node) in dag.nodes.iter().enumerate() {
        if node.id.is_empty() {
            diagnostics.add_error(
                DiagnosticCode::MissingRequiredField,
                format!("nodes[{}].id", i),
                "Node has no id",
                None,
            );
        }
    }

    for (i, edge) in dag.edges.iter().enumerate() {
        let path = format!("edges[{}]", i);
        let required = [
            ("id", &edge.id),
            ("source", &edge.source),
            ("target", &edge.target),
        ];
        for (field, value) in required {
            if value.is_empty() {
                diagnostics.add_error(
                    DiagnosticCode::MissingRequiredField,
                    format!("{}.{}", path, field),
                    format!("Edge has no {}", field),
                    None,
                );
            }
        }
        if !ids.contains(edge.source.as_str()) {
            diagnostics.add_error(
                DiagnosticCode::MissingSourceRef,
                format!("{}.source", path),
                format!("Edge source '{}' is not a node", edge.source),
                None,
            );
        }
        if !ids.contains(edge.target.as_str()) {
            diagnostics.add_error(
                DiagnosticCode::MissingTargetRef,
                format!("{}.target", path),
                format!("Edge target '{}' is not a node", edge.target),
                None,
            );
        }
    }

    warn_orphans(dag, diagnostics);
    warn_unjoined_branches(dag, diagnostics);

    diagnostics.errors.len() == before
}

/// A node touched by no edge is an orphan.
fn warn_orphans(dag: &DagDocument, diagnostics: &mut Diagnostics) {
    let connected: AHashSet<&str> = dag
        .edges
        .iter()
        .flat_map(|e| [e.source.as_str(), e.target.as_str()])
        .collect();

    for (i, node) in dag.nodes.iter().enumerate() {
        if !connected.contains(node.id.as_str()) {
            diagnostics.add_warning(
                DiagnosticCode::OrphanNode,
                format!("nodes[{}]", i),
                format!("Node '{}' ({}) has no edges", node.id, node.label),
                None,
            );
        }
    }
}

/// Warns for each parallel branch from which the matching join cannot be reached.
fn warn_unjoined_branches(dag: &DagDocument, diagnostics: &mut Diagnostics) {
    let adjacency: AHashMap<&str, Vec<&str>> = dag
        .edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .into_group_map()
        .into_iter()
        .collect();

    for (i, node) in dag.nodes.iter().enumerate() {
        let NodeData::Parallel(parallel) = &node.data else {
            continue;
        };
        for branch in parallel.branches.iter().unique() {
            if !reaches(&adjacency, branch, &parallel.join) {
                diagnostics.add_warning(
                    DiagnosticCode::ParallelBranchUnjoined,
                    format!("nodes[{}]", i),
                    format!(
                        "Branch '{}' of '{}' never reaches join '{}'",
                        branch, node.id, parallel.join
                    ),
                    Some("Route the end of the branch to the join".to_string()),
                );
            }
        }
    }
}

fn reaches<'a>(adjacency: &AHashMap<&'a str, Vec<&'a str>>, start: &'a str, goal: &str) -> bool {
    let mut seen: AHashSet<&str> = AHashSet::new();
    let mut stack = vec![start];
    while let Some(current) = stack.pop() {
        if current == goal {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        if let Some(next) = adjacency.get(current) {
            stack.extend(next.iter().copied());
        }
    }
    false
}
