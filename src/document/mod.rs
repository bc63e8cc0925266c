//! Typed documents flowing through the compiler.
//!
//! A Template and an Executable share one shape ([`Workflow`]); the Executable is
//! simply a workflow whose triggers and actions carry `exec` blocks. The DAG is a
//! separate model with a closed payload variant per node type.

pub mod dag;
mod lenient;
pub mod policy;
pub mod workflow;

pub use dag::*;
pub use policy::*;
pub use workflow::*;
