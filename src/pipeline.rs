//! Both stages back to back: Template JSON + context → Executable JSON → DAG JSON.

use crate::context::CompileContext;
use crate::diagnostics::Diagnostics;
use crate::document::{DagDocument, ExecutableDocument};
use crate::lowerer::GraphLowerer;
use crate::materializer::TemplateMaterializer;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub executable: Option<ExecutableDocument>,
    pub dag: Option<DagDocument>,
    /// Materializer report followed by the lowerer report.
    pub diagnostics: Diagnostics,
}

#[derive(Default)]
pub struct Pipeline {
    materializer: TemplateMaterializer,
    lowerer: GraphLowerer,
}

impl Pipeline {
    pub fn new(materializer: TemplateMaterializer, lowerer: GraphLowerer) -> Self {
        Self {
            materializer,
            lowerer,
        }
    }

    /// Materializes `template` and, when that yields a document, lowers it.
    ///
    /// The context's user id is carried into the DAG's `user_id`.
    pub fn run(&mut self, template: &Value, context: &CompileContext) -> PipelineOutcome {
        let materialized = self.materializer.compile(template, context);
        let mut diagnostics = materialized.diagnostics;

        let Some(executable) = materialized.document else {
            return PipelineOutcome {
                executable: None,
                dag: None,
                diagnostics,
            };
        };

        let mut lowering_input = executable.clone();
        if let Some(user_id) = context.user_id() {
            lowering_input
                .extra
                .entry("user_id")
                .or_insert_with(|| Value::String(user_id.to_string()));
        }
        let lowered = self.lowerer.compile_document(&lowering_input);
        diagnostics.merge(lowered.diagnostics);

        PipelineOutcome {
            executable: Some(executable),
            dag: lowered.document,
            diagnostics,
        }
    }
}
