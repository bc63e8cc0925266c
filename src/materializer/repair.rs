use crate::diagnostics::{Diagnostics, Repair};
use crate::document::ExecutableDocument;

/// Defines the contract for patching a materialized document before final validation.
///
/// A strategy sees the diagnostics gathered so far and returns the patched document
/// together with one [`Repair`] record per change it made.
pub trait RepairStrategy: Send + Sync {
    fn name(&self) -> &str;
    fn repair(
        &self,
        document: ExecutableDocument,
        diagnostics: &Diagnostics,
    ) -> (ExecutableDocument, Vec<Repair>);
}

/// The default strategy: returns the document untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRepair;

impl RepairStrategy for NoRepair {
    fn name(&self) -> &str {
        "none"
    }

    fn repair(
        &self,
        document: ExecutableDocument,
        _diagnostics: &Diagnostics,
    ) -> (ExecutableDocument, Vec<Repair>) {
        (document, Vec::new())
    }
}
