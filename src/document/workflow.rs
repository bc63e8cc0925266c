use super::lenient;
use super::policy::{Policies, RateLimit, RetryPolicy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// A workflow version. Generators emit integers, floats, strings, or the odd boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Version {
    Integer(i64),
    Float(f64),
    Text(String),
    Flag(bool),
}

/// Renders the version as it enters the trigger instance hash.
///
/// Floats keep their fractional part (`1.0`, not `1`); booleans read `True`/`False`.
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Integer(n) => write!(f, "{}", n),
            Version::Float(x) => match Number::from_f64(*x) {
                Some(n) => write!(f, "{}", n),
                None => write!(f, "{}", x),
            },
            Version::Text(s) => f.write_str(s),
            Version::Flag(true) => f.write_str("True"),
            Version::Flag(false) => f.write_str("False"),
        }
    }
}

/// A workflow document.
///
/// The same shape serves as Template (no `exec` blocks yet) and Executable
/// (every trigger and action resolved). Unknown top-level keys are carried through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub workflow_id: String,
    pub version: Version,
    pub triggers: Vec<Trigger>,
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_control: Option<FlowControl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<Policies>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type TemplateDocument = Workflow;
pub type ExecutableDocument = Workflow;

impl Workflow {
    /// Paths (`triggers[i]`, `actions[i]`) of every entity lacking an `exec` block.
    pub fn entities_missing_exec(&self) -> Vec<(String, String)> {
        let triggers = self
            .triggers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.exec.is_none())
            .map(|(i, t)| (format!("triggers[{}]", i), t.local_id.clone()));
        let actions = self
            .actions
            .iter()
            .enumerate()
            .filter(|(_, a)| a.exec.is_none())
            .map(|(i, a)| (format!("actions[{}]", i), a.local_id.clone()));
        triggers.chain(actions).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub local_id: String,
    #[serde(default)]
    pub toolkit_slug: String,
    /// Catalog id or slug.
    #[serde(default)]
    pub trigger_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<String>,
    #[serde(default)]
    pub configuration: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_hint: Option<String>,
    /// `"scheduled"` marks a schedule-based trigger.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<TriggerExec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Trigger {
    pub fn is_scheduled(&self) -> bool {
        self.trigger_type.as_deref() == Some("scheduled")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerExec {
    pub provider: String,
    pub trigger_slug: String,
    pub configuration: Map<String, Value>,
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_instance_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub local_id: String,
    #[serde(default)]
    pub toolkit_slug: String,
    /// Catalog id or slug.
    #[serde(default)]
    pub action_ref: String,
    #[serde(default)]
    pub required_inputs: Map<String, Value>,
    #[serde(default)]
    pub optional_inputs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_number"
    )]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_vars: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ActionExec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExec {
    pub provider: String,
    pub action_slug: String,
    pub connection_id: String,
    pub required_inputs: Map<String, Value>,
    pub optional_inputs: Map<String, Value>,
    pub retry: RetryPolicy,
    pub timeout_ms: u64,
    pub rate_limit: RateLimit,
}

/// Control-flow constructs layered over the triggers and actions.
///
/// Every `*_ref` names a trigger or action `local_id`, or the `local_id` of
/// another flow-control block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowControl {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Conditional>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parallel_execution: Vec<ParallelBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loops: Vec<LoopBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming_ref: Option<String>,
    #[serde(default)]
    pub branches: Vec<ConditionBranch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub else_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionBranch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Opaque condition AST, interpreted only by the executor.
    #[serde(default)]
    pub expr: Value,
    #[serde(default)]
    pub to_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming_ref: Option<String>,
    #[serde(default)]
    pub branches: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outgoing_ref: Option<String>,
    /// Reference under which the join node is indexed. Defaults to `{local_id}.join`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl ParallelBlock {
    pub fn join_key(&self) -> Option<String> {
        self.join_ref
            .clone()
            .or_else(|| self.local_id.as_ref().map(|id| format!("{}.join", id)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoopBlock {
    While(WhileLoop),
    Foreach(ForeachLoop),
}

impl LoopBlock {
    pub fn local_id(&self) -> Option<&str> {
        match self {
            LoopBlock::While(l) => l.local_id.as_deref(),
            LoopBlock::Foreach(l) => l.local_id.as_deref(),
        }
    }

    pub fn incoming_ref(&self) -> Option<&str> {
        match self {
            LoopBlock::While(l) => l.incoming_ref.as_deref(),
            LoopBlock::Foreach(l) => l.incoming_ref.as_deref(),
        }
    }

    pub fn body_ref(&self) -> Option<&str> {
        match self {
            LoopBlock::While(l) => l.body_ref.as_deref(),
            LoopBlock::Foreach(l) => l.body_ref.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileLoop {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming_ref: Option<String>,
    #[serde(default)]
    pub condition: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_ref: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_number"
    )]
    pub max_iterations: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeachLoop {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming_ref: Option<String>,
    #[serde(default)]
    pub source_array_expr: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_var: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_var: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_ref: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_number"
    )]
    pub max_concurrency: Option<u32>,
}

/// An explicit edge between two referenced entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub from_ref: String,
    #[serde(default)]
    pub to_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}
