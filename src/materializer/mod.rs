//! Template Materializer (Template JSON + context → Executable JSON).
//!
//! The materializer resolves every trigger and action of a template against the
//! catalog, normalizes parameters, resolves policies, and attaches an `exec`
//! block to each entity. Problems are accumulated rather than thrown: a failing
//! entity only loses its `exec` block, and the document is withheld at the end
//! if any entity is left unresolved.

mod coercion;
mod policy;
pub mod repair;
mod resolve;
pub mod secrets;

pub use coercion::coerce_value;
pub use repair::{NoRepair, RepairStrategy};
pub use secrets::SecretScanner;

use crate::context::CompileContext;
use crate::diagnostics::{CompileOutcome, DiagnosticCode, Diagnostics};
use crate::document::{ExecutableDocument, Policies, TemplateDocument, Workflow};
use crate::error::CompileError;
use crate::shared::{apply_answers, unresolved_placeholders, validate_required_fields};
use serde_json::Value;

const REQUIRED_FIELDS: [&str; 4] = ["workflow_id", "version", "triggers", "actions"];
const ENTITY_COLLECTIONS: [&str; 2] = ["triggers", "actions"];
const PARAM_FIELDS: [&str; 3] = ["configuration", "required_inputs", "optional_inputs"];

pub struct TemplateMaterializer {
    repair: Box<dyn RepairStrategy>,
    scanner: SecretScanner,
    diagnostics: Diagnostics,
}

pub struct MaterializerBuilder {
    repair: Box<dyn RepairStrategy>,
    scanner: SecretScanner,
}

impl MaterializerBuilder {
    pub fn new() -> Self {
        Self {
            repair: Box::new(NoRepair),
            scanner: SecretScanner::default(),
        }
    }

    pub fn with_repair_strategy(mut self, strategy: Box<dyn RepairStrategy>) -> Self {
        self.repair = strategy;
        self
    }

    pub fn with_secret_scanner(mut self, scanner: SecretScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn build(self) -> TemplateMaterializer {
        TemplateMaterializer {
            repair: self.repair,
            scanner: self.scanner,
            diagnostics: Diagnostics::new(),
        }
    }
}

impl Default for MaterializerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for TemplateMaterializer {
    fn default() -> Self {
        MaterializerBuilder::new().build()
    }
}

impl TemplateMaterializer {
    pub fn builder() -> MaterializerBuilder {
        MaterializerBuilder::new()
    }

    /// Materializes a raw template.
    ///
    /// `document` is `None` when the template is structurally invalid or when any
    /// trigger or action could not be resolved; `diagnostics` says why.
    #[tracing::instrument(name = "materialize", skip_all, fields(workflow_id = tracing::field::Empty))]
    pub fn compile(
        &mut self,
        template: &Value,
        context: &CompileContext,
    ) -> CompileOutcome<ExecutableDocument> {
        self.diagnostics = Diagnostics::new();
        if let Some(id) = template.get("workflow_id").and_then(Value::as_str) {
            tracing::Span::current().record("workflow_id", id);
        }

        let document = match self.materialize(template, context) {
            Ok(document) => document,
            Err(err) => {
                self.diagnostics
                    .add_error(DiagnosticCode::InternalError, "", err.to_string(), None);
                None
            }
        };

        let diagnostics = std::mem::take(&mut self.diagnostics);
        if document.is_some() {
            tracing::info!(
                errors = diagnostics.errors.len(),
                warnings = diagnostics.warnings.len(),
                "template materialized"
            );
        } else {
            tracing::warn!(
                errors = diagnostics.errors.len(),
                warnings = diagnostics.warnings.len(),
                "template materialization failed"
            );
        }
        CompileOutcome {
            document,
            diagnostics,
        }
    }

    /// Materializes an already-typed template.
    pub fn compile_document(
        &mut self,
        template: &TemplateDocument,
        context: &CompileContext,
    ) -> CompileOutcome<ExecutableDocument> {
        match serde_json::to_value(template) {
            Ok(raw) => self.compile(&raw, context),
            Err(source) => CompileOutcome::internal(CompileError::Serialization {
                what: "template".to_string(),
                source,
            }),
        }
    }

    fn materialize(
        &mut self,
        template: &Value,
        context: &CompileContext,
    ) -> Result<Option<ExecutableDocument>, CompileError> {
        if !self.validate_template(template) {
            return Ok(None);
        }

        let mut working = template.clone();
        apply_answers(&mut working, &context.answers);
        self.hint_unresolved_placeholders(&working);
        policy::coerce_policy_numbers(&mut working, &mut self.diagnostics);

        let mut workflow: Workflow =
            serde_json::from_value(working).map_err(|source| CompileError::MalformedDocument {
                path: "template".to_string(),
                source,
            })?;

        for (i, trigger) in workflow.triggers.iter_mut().enumerate() {
            resolve::resolve_trigger(
                trigger,
                &format!("triggers[{}]", i),
                &workflow.workflow_id,
                &workflow.version,
                context,
                &mut self.diagnostics,
            );
        }
        for (i, action) in workflow.actions.iter_mut().enumerate() {
            resolve::resolve_action(
                action,
                &format!("actions[{}]", i),
                context,
                &mut self.diagnostics,
            );
        }

        inject_default_policies(&mut workflow, &context.defaults);

        let serialized =
            serde_json::to_value(&workflow).map_err(|source| CompileError::Serialization {
                what: "executable document".to_string(),
                source,
            })?;
        self.scanner.scan(&serialized, &mut self.diagnostics);

        let (workflow, repairs) = self.repair.repair(workflow, &self.diagnostics);
        if !repairs.is_empty() {
            tracing::debug!(
                strategy = self.repair.name(),
                count = repairs.len(),
                "repairs applied"
            );
        }
        self.diagnostics.repairs.extend(repairs);

        let missing = workflow.entities_missing_exec();
        if !missing.is_empty() {
            for (path, local_id) in missing {
                self.diagnostics.add_error(
                    DiagnosticCode::MissingExecBlock,
                    path,
                    format!("'{}' has no exec block", local_id),
                    Some("Resolve the errors reported for this entity".to_string()),
                );
            }
            return Ok(None);
        }
        Ok(Some(workflow))
    }

    /// Checks the top-level fields, and `local_id` on every trigger and action.
    fn validate_template(&mut self, template: &Value) -> bool {
        let mut valid =
            validate_required_fields(template, &REQUIRED_FIELDS, "", &mut self.diagnostics);
        for collection in ENTITY_COLLECTIONS {
            let Some(Value::Array(items)) = template.get(collection) else {
                continue;
            };
            for (i, item) in items.iter().enumerate() {
                valid &= validate_required_fields(
                    item,
                    &["local_id"],
                    &format!("{}[{}]", collection, i),
                    &mut self.diagnostics,
                );
            }
        }
        valid
    }

    fn hint_unresolved_placeholders(&mut self, working: &Value) {
        for collection in ENTITY_COLLECTIONS {
            let Some(Value::Array(items)) = working.get(collection) else {
                continue;
            };
            for (i, item) in items.iter().enumerate() {
                for field in PARAM_FIELDS {
                    if let Some(params) = item.get(field) {
                        let path = format!("{}[{}].{}", collection, i, field);
                        hint_placeholders(params, &path, &mut self.diagnostics);
                    }
                }
            }
        }
    }
}

fn hint_placeholders(value: &Value, path: &str, diagnostics: &mut Diagnostics) {
    match value {
        Value::String(text) => {
            for key in unresolved_placeholders(text) {
                diagnostics.add_hint(format!(
                    "Unresolved placeholder '{{{{{}}}}}' at {}",
                    key, path
                ));
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                hint_placeholders(item, &format!("{}[{}]", path, i), diagnostics);
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                hint_placeholders(child, &format!("{}.{}", path, key), diagnostics);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Fills unset workflow policies from the context defaults.
fn inject_default_policies(workflow: &mut Workflow, defaults: &Policies) {
    if *defaults == Policies::default() {
        return;
    }
    workflow
        .policies
        .get_or_insert_with(Policies::default)
        .fill_missing_from(defaults);
}
