//! # Kumitate - Workflow DSL Compiler
//!
//! **Kumitate** turns automation intents ("when X happens, do Y") into graphs an
//! executor can run. It is a two-stage compiler that works purely in memory and
//! never fails fast: every stage returns its output document (or `None`) next to
//! a structured [`Diagnostics`](diagnostics::Diagnostics) report.
//!
//! ## Core Workflow
//!
//! 1.  **Build a Context**: Load the catalog, the user, their connections, the
//!     answers to the template's questions and any policy defaults, then build a
//!     [`CompileContext`](context::CompileContext). The catalog is indexed once here.
//! 2.  **Materialize**: The [`TemplateMaterializer`](materializer::TemplateMaterializer)
//!     resolves each trigger and action against the catalog and attaches an `exec`
//!     block (provider, connection, normalized parameters, policies).
//! 3.  **Lower**: The [`GraphLowerer`](lowerer::GraphLowerer) turns the executable
//!     document into explicit nodes and edges, expanding conditions, parallel
//!     fan-out/join and loops.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kumitate::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let catalog: Catalog = load_json("catalog.json")?;
//!     let connections: Connections = load_json("connections.json")?;
//!     let template: serde_json::Value = load_json("template.json")?;
//!
//!     let context = CompileContext::builder(catalog)
//!         .user(UserInfo { id: Some("u1".to_string()), tenant_id: None })
//!         .connections(connections)
//!         .build();
//!
//!     let mut materializer = TemplateMaterializer::builder().build();
//!     let materialized = materializer.compile(&template, &context);
//!     print!("{}", materialized.diagnostics);
//!
//!     if let Some(executable) = materialized.document {
//!         let mut lowerer = GraphLowerer::builder().with_layout(LayoutKind::Elk).build();
//!         let lowered = lowerer.compile_document(&executable);
//!         if let Some(dag) = lowered.document {
//!             println!("{}", serde_json::to_string_pretty(&dag)?);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod lowerer;
pub mod materializer;
pub mod pipeline;
pub mod prelude;
pub mod shared;
