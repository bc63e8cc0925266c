//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types from the kumitate crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use kumitate::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let catalog: Catalog = load_json("path/to/catalog.json")?;
//! let template: serde_json::Value = load_json("path/to/template.json")?;
//! let context = CompileContext::builder(catalog).build();
//!
//! let mut pipeline = Pipeline::default();
//! let outcome = pipeline.run(&template, &context);
//! println!("{}", outcome.diagnostics);
//! # Ok(())
//! # }
//! ```

// Compiler stages
pub use crate::lowerer::{GraphLowerer, LayoutStrategy};
pub use crate::materializer::{RepairStrategy, SecretScanner, TemplateMaterializer};
pub use crate::pipeline::{Pipeline, PipelineOutcome};

// Inputs
pub use crate::context::{
    Catalog, CompileContext, Connection, Connections, UserInfo, load_json,
};

// Documents
pub use crate::document::{
    DagDocument, Edge, ExecutableDocument, LayoutKind, Node, NodeData, NodeType, Policies,
    TemplateDocument, Workflow,
};

// Reports and errors
pub use crate::diagnostics::{CompileOutcome, DiagnosticCode, DiagnosticEntry, Diagnostics};
pub use crate::error::{CompileError, ContextError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
