use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::document::{DEFAULT_WHEN, Edge, Node, NodeData, NodeType};
use crate::shared::generate_id;
use ahash::AHashMap;
use serde_json::Value;

/// The six namespaces a reference can resolve in, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefKind {
    Trigger,
    Action,
    Gateway,
    Parallel,
    Join,
    Loop,
}

const LOOKUP_ORDER: [RefKind; 6] = [
    RefKind::Trigger,
    RefKind::Action,
    RefKind::Gateway,
    RefKind::Parallel,
    RefKind::Join,
    RefKind::Loop,
];

/// Local reference → node id, one table per [`RefKind`].
#[derive(Debug, Default)]
pub(crate) struct RefIndex {
    tables: [AHashMap<String, String>; 6],
}

impl RefIndex {
    pub fn insert(&mut self, kind: RefKind, reference: &str, node_id: &str) {
        self.tables[kind as usize].insert(reference.to_string(), node_id.to_string());
    }

    /// First hit across the tables in lookup order.
    pub fn lookup(&self, reference: &str) -> Option<&str> {
        LOOKUP_ORDER
            .iter()
            .find_map(|kind| self.tables[*kind as usize].get(reference))
            .map(String::as_str)
    }
}

/// Per-prefix node counters and the edge counter.
#[derive(Debug, Default)]
pub(crate) struct IdCounters {
    nodes: AHashMap<&'static str, u32>,
    edges: u32,
}

impl IdCounters {
    pub fn next_node(&mut self, node_type: NodeType) -> String {
        let prefix = node_type.id_prefix();
        let seq = self.nodes.entry(prefix).or_insert(0);
        *seq += 1;
        generate_id(prefix, *seq)
    }

    pub fn next_edge(&mut self) -> String {
        self.edges += 1;
        generate_id("e", self.edges)
    }
}

/// Everything one lowering pass accumulates. Replaced wholesale on each compile.
#[derive(Debug, Default)]
pub(crate) struct GraphState {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub index: RefIndex,
    pub ids: IdCounters,
    pub diagnostics: Diagnostics,
}

impl GraphState {
    pub fn push_node(&mut self, id: String, data: NodeData, label: &str, icon: Option<String>) {
        tracing::debug!(id = %id, node_type = %data.node_type(), "node added");
        self.nodes.push(Node {
            id,
            data,
            label: label.to_string(),
            icon,
            position: None,
        });
    }

    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        when: Option<&str>,
        condition: Option<Value>,
        label: Option<&str>,
    ) {
        let id = self.ids.next_edge();
        self.edges.push(Edge {
            id,
            source: source.to_string(),
            target: target.to_string(),
            when: when.unwrap_or(DEFAULT_WHEN).to_string(),
            condition,
            label: label.map(str::to_string),
        });
    }

    pub fn has_edge(&self, source: &str, target: &str, when: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target && e.when == when)
    }

    /// Resolves `reference` to a node id, warning with `UNRESOLVED_REF` on a miss.
    pub fn resolve(&mut self, reference: &str, path: &str) -> Option<String> {
        if let Some(id) = self.index.lookup(reference) {
            return Some(id.to_string());
        }
        self.diagnostics.add_warning(
            DiagnosticCode::UnresolvedRef,
            path,
            format!("Reference '{}' does not name any node", reference),
            None,
        );
        None
    }

    /// Adds an unconditional edge from the node `incoming_ref` names, when it resolves.
    pub fn wire_incoming(&mut self, incoming_ref: Option<&str>, target: &str, path: &str) {
        let Some(reference) = incoming_ref else {
            return;
        };
        if let Some(source) = self.resolve(reference, &format!("{}.incoming_ref", path)) {
            self.add_edge(&source, target, None, None, None);
        }
    }
}
