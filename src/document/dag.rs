use super::policy::{RateLimit, RetryPolicy};
use super::workflow::Version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The `when` of an edge that does not name one.
pub const DEFAULT_WHEN: &str = "success";

/// The executor-ready graph produced by the lowerer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagDocument {
    pub workflow_id: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub globals: Globals,
    pub ui: UiHints,
}

impl DagDocument {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes_of_type(&self, node_type: NodeType) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.data.node_type() == node_type)
            .collect()
    }

    pub fn outgoing(&self, id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.source == id).collect()
    }
}

/// A graph node. `type` and `data` are serialized side by side from [`NodeData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(flatten)]
    pub data: NodeData,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Trigger,
    Action,
    GatewayIf,
    Parallel,
    Join,
    LoopWhile,
    LoopForeach,
}

impl NodeType {
    /// Prefix of the ids generated for this node type.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            NodeType::Trigger => "t",
            NodeType::Action => "a",
            NodeType::GatewayIf => "g",
            NodeType::Parallel => "par",
            NodeType::Join => "join",
            NodeType::LoopWhile | NodeType::LoopForeach => "loop",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Trigger => "trigger",
            NodeType::Action => "action",
            NodeType::GatewayIf => "gateway_if",
            NodeType::Parallel => "parallel",
            NodeType::Join => "join",
            NodeType::LoopWhile => "loop_while",
            NodeType::LoopForeach => "loop_foreach",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-type node payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NodeData {
    Trigger(TriggerNode),
    Action(ActionNode),
    GatewayIf(GatewayNode),
    Parallel(ParallelNode),
    Join(JoinNode),
    LoopWhile(LoopWhileNode),
    LoopForeach(LoopForeachNode),
}

impl NodeData {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeData::Trigger(_) => NodeType::Trigger,
            NodeData::Action(_) => NodeType::Action,
            NodeData::GatewayIf(_) => NodeType::GatewayIf,
            NodeData::Parallel(_) => NodeType::Parallel,
            NodeData::Join(_) => NodeType::Join,
            NodeData::LoopWhile(_) => NodeType::LoopWhile,
            NodeData::LoopForeach(_) => NodeType::LoopForeach,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    ScheduleBased,
    EventBased,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerNode {
    pub kind: TriggerKind,
    pub provider: String,
    pub toolkit: String,
    pub trigger: String,
    pub connection_id: String,
    pub configuration: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputTemplate {
    pub required: Map<String, Value>,
    pub optional: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionNode {
    pub provider: String,
    pub tool: String,
    pub action: String,
    pub connection_id: String,
    pub input_template: InputTemplate,
    pub output_vars: Vec<String>,
    pub retry: RetryPolicy,
    pub timeout_ms: u64,
    pub rate_limit: RateLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayBranch {
    pub name: String,
    pub expr: Value,
    /// Absent when the branch target could not be resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayNode {
    pub branches: Vec<GatewayBranch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub else_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelNode {
    /// Node ids the fan-out starts.
    pub branches: Vec<String>,
    pub join: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinNode {
    pub mode: JoinMode,
    pub parallel: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopWhileNode {
    pub condition: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_start: Option<String>,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopForeachNode {
    pub source_array_expr: Value,
    pub item_var: String,
    pub index_var: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_start: Option<String>,
    pub max_concurrency: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default = "default_when")]
    pub when: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn default_when() -> String {
    DEFAULT_WHEN.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Globals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
    pub max_parallelism: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Names the external layout engine expected to compute real geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    #[default]
    Dagre,
    Elk,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiHints {
    pub layout: LayoutKind,
    pub viewport: Viewport,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
