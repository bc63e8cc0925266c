//! Graph Lowerer (Executable JSON → DAG JSON).
//!
//! Triggers and actions become nodes first, then each flow-control construct is
//! lowered into explicit gateway, fan-out/join and loop nodes wired together with
//! edges. References are resolved through an index that maps every local id
//! (and every parallel join key) to the node id it produced.

mod flow_control;
mod graph;
pub mod layout;
mod nodes;
mod validate;

pub use layout::{DagreLayout, ElkLayout, LayoutStrategy, ManualLayout, strategy_for};

use crate::context::{Catalog, CatalogIndex};
use crate::diagnostics::{CompileOutcome, DiagnosticCode, Diagnostics};
use crate::document::{
    DagDocument, ExecutableDocument, Globals, LayoutKind, Policies, UiHints, Viewport, Workflow,
};
use crate::error::CompileError;
use crate::shared::{get_path, set_path, validate_required_fields};
use graph::GraphState;
use serde_json::{Map, Value};

/// `max_parallelism` used when the workflow's policies do not set one.
pub const DEFAULT_MAX_PARALLELISM: u32 = 10;

const REQUIRED_FIELDS: [&str; 4] = ["workflow_id", "version", "triggers", "actions"];
const ENTITY_COLLECTIONS: [&str; 2] = ["triggers", "actions"];

pub struct GraphLowerer {
    layout: Box<dyn LayoutStrategy>,
    max_parallelism: u32,
    ui_defaults: Map<String, Value>,
    catalog: Option<CatalogIndex>,
    state: GraphState,
}

pub struct LowererBuilder {
    layout: Box<dyn LayoutStrategy>,
    max_parallelism: u32,
    ui_defaults: Map<String, Value>,
    catalog: Option<CatalogIndex>,
}

impl LowererBuilder {
    pub fn new() -> Self {
        Self {
            layout: strategy_for(LayoutKind::default()),
            max_parallelism: DEFAULT_MAX_PARALLELISM,
            ui_defaults: Map::new(),
            catalog: None,
        }
    }

    pub fn with_layout(mut self, kind: LayoutKind) -> Self {
        self.layout = strategy_for(kind);
        self
    }

    pub fn with_layout_strategy(mut self, strategy: Box<dyn LayoutStrategy>) -> Self {
        self.layout = strategy;
        self
    }

    pub fn with_max_parallelism(mut self, max_parallelism: u32) -> Self {
        self.max_parallelism = max_parallelism;
        self
    }

    /// UI keys in dot-path form (`"viewport.zoom"`, `"theme.accent"`), applied only where unset.
    pub fn with_ui_defaults(mut self, ui_defaults: Map<String, Value>) -> Self {
        self.ui_defaults = ui_defaults;
        self
    }

    /// Lets nodes pick up icons and display names from the catalog.
    pub fn with_catalog(mut self, catalog: &Catalog) -> Self {
        self.catalog = Some(CatalogIndex::build(catalog));
        self
    }

    pub fn with_catalog_index(mut self, index: CatalogIndex) -> Self {
        self.catalog = Some(index);
        self
    }

    pub fn build(self) -> GraphLowerer {
        GraphLowerer {
            layout: self.layout,
            max_parallelism: self.max_parallelism,
            ui_defaults: self.ui_defaults,
            catalog: self.catalog,
            state: GraphState::default(),
        }
    }
}

impl Default for LowererBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for GraphLowerer {
    fn default() -> Self {
        LowererBuilder::new().build()
    }
}

impl GraphLowerer {
    pub fn builder() -> LowererBuilder {
        LowererBuilder::new()
    }

    /// Lowers a raw executable document.
    ///
    /// `document` is `None` when the input is invalid, when a route end does not
    /// resolve, or when the finished graph fails validation.
    #[tracing::instrument(name = "lower", skip_all, fields(workflow_id = tracing::field::Empty))]
    pub fn compile(&mut self, executable: &Value) -> CompileOutcome<DagDocument> {
        self.state = GraphState::default();
        if let Some(id) = executable.get("workflow_id").and_then(Value::as_str) {
            tracing::Span::current().record("workflow_id", id);
        }

        let document = match self.lower(executable) {
            Ok(document) => document,
            Err(err) => {
                self.state.diagnostics.add_error(
                    DiagnosticCode::InternalError,
                    "",
                    err.to_string(),
                    None,
                );
                None
            }
        };

        let diagnostics = std::mem::take(&mut self.state.diagnostics);
        match &document {
            Some(dag) => tracing::info!(
                nodes = dag.nodes.len(),
                edges = dag.edges.len(),
                warnings = diagnostics.warnings.len(),
                "workflow lowered"
            ),
            None => tracing::warn!(
                errors = diagnostics.errors.len(),
                warnings = diagnostics.warnings.len(),
                "workflow lowering failed"
            ),
        }
        CompileOutcome {
            document,
            diagnostics,
        }
    }

    /// Lowers an already-typed executable document.
    pub fn compile_document(
        &mut self,
        executable: &ExecutableDocument,
    ) -> CompileOutcome<DagDocument> {
        match serde_json::to_value(executable) {
            Ok(raw) => self.compile(&raw),
            Err(source) => CompileOutcome::internal(CompileError::Serialization {
                what: "executable document".to_string(),
                source,
            }),
        }
    }

    fn lower(&mut self, executable: &Value) -> Result<Option<DagDocument>, CompileError> {
        if !validate_executable(executable, &mut self.state.diagnostics) {
            return Ok(None);
        }
        let workflow: Workflow = serde_json::from_value(executable.clone()).map_err(|source| {
            CompileError::MalformedDocument {
                path: "executable".to_string(),
                source,
            }
        })?;

        let catalog = self.catalog.as_ref();
        for trigger in &workflow.triggers {
            nodes::lower_trigger(trigger, catalog, &mut self.state);
        }
        for action in &workflow.actions {
            nodes::lower_action(action, catalog, &mut self.state);
        }

        let routes_resolved = match &workflow.flow_control {
            Some(flow) => flow_control::lower_flow_control(flow, &mut self.state),
            None => true,
        };
        flow_control::lower_dependencies(&workflow.actions, &mut self.state);
        if !routes_resolved {
            return Ok(None);
        }

        let mut nodes = std::mem::take(&mut self.state.nodes);
        self.layout.place(&mut nodes);

        let dag = DagDocument {
            user_id: workflow
                .extra
                .get("user_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            globals: self.globals(workflow.policies.as_ref()),
            ui: self.ui_hints()?,
            workflow_id: workflow.workflow_id,
            version: workflow.version,
            nodes,
            edges: std::mem::take(&mut self.state.edges),
        };

        if !validate::validate_dag(&dag, &mut self.state.diagnostics) {
            return Ok(None);
        }
        Ok(Some(dag))
    }

    fn globals(&self, policies: Option<&Policies>) -> Globals {
        let policies = policies.cloned().unwrap_or_default();
        Globals {
            retry: policies.retry,
            timeout_ms: policies.timeout_ms,
            rate_limit: policies.rate_limit,
            max_parallelism: policies.max_parallelism.unwrap_or(self.max_parallelism),
        }
    }

    fn ui_hints(&self) -> Result<UiHints, CompileError> {
        let hints = UiHints {
            layout: self.layout.kind(),
            viewport: Viewport::default(),
            extra: Map::new(),
        };
        if self.ui_defaults.is_empty() {
            return Ok(hints);
        }

        let mut raw =
            serde_json::to_value(&hints).map_err(|source| CompileError::Serialization {
                what: "ui hints".to_string(),
                source,
            })?;
        for (key, value) in &self.ui_defaults {
            if get_path(&raw, key).is_none() {
                set_path(&mut raw, key, value.clone());
            }
        }
        serde_json::from_value(raw).map_err(|source| CompileError::MalformedDocument {
            path: "ui".to_string(),
            source,
        })
    }
}

/// Required fields plus an `exec` block on every trigger and action.
fn validate_executable(executable: &Value, diagnostics: &mut Diagnostics) -> bool {
    let mut valid = validate_required_fields(executable, &REQUIRED_FIELDS, "", diagnostics);
    for collection in ENTITY_COLLECTIONS {
        let Some(Value::Array(items)) = executable.get(collection) else {
            continue;
        };
        for (i, item) in items.iter().enumerate() {
            let path = format!("{}[{}]", collection, i);
            valid &= validate_required_fields(item, &["local_id"], &path, diagnostics);
            if item.get("exec").is_none_or(Value::is_null) {
                diagnostics.add_error(
                    DiagnosticCode::MissingExecBlock,
                    path,
                    "Entity has no exec block; materialize the template first",
                    None,
                );
                valid = false;
            }
        }
    }
    valid
}
