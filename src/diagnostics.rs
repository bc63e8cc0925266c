//! Structured diagnostics shared by both compiler stages.
//!
//! Neither stage fails fast. Every problem is recorded in a [`Diagnostics`] report
//! that is returned next to the (possibly absent) output document, so a host can
//! show the user everything that went wrong in one pass.

use crate::error::CompileError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every code either stage can emit.
///
/// Codes serialize as `SCREAMING_SNAKE_CASE` strings, which is the wire format
/// hosts match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Errors
    MissingRequiredField,
    UnknownTrigger,
    UnknownAction,
    UnsupportedDelivery,
    MissingConnection,
    MissingRequiredParam,
    MissingExecBlock,
    MissingSourceRef,
    MissingTargetRef,
    InternalError,

    // Warnings
    ParamCoercionFailed,
    PotentialSecret,
    UnresolvedRef,
    OrphanNode,
    ParallelBranchUnjoined,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            DiagnosticCode::UnknownTrigger => "UNKNOWN_TRIGGER",
            DiagnosticCode::UnknownAction => "UNKNOWN_ACTION",
            DiagnosticCode::UnsupportedDelivery => "UNSUPPORTED_DELIVERY",
            DiagnosticCode::MissingConnection => "MISSING_CONNECTION",
            DiagnosticCode::MissingRequiredParam => "MISSING_REQUIRED_PARAM",
            DiagnosticCode::MissingExecBlock => "MISSING_EXEC_BLOCK",
            DiagnosticCode::MissingSourceRef => "MISSING_SOURCE_REF",
            DiagnosticCode::MissingTargetRef => "MISSING_TARGET_REF",
            DiagnosticCode::InternalError => "INTERNAL_ERROR",
            DiagnosticCode::ParamCoercionFailed => "PARAM_COERCION_FAILED",
            DiagnosticCode::PotentialSecret => "POTENTIAL_SECRET",
            DiagnosticCode::UnresolvedRef => "UNRESOLVED_REF",
            DiagnosticCode::OrphanNode => "ORPHAN_NODE",
            DiagnosticCode::ParallelBranchUnjoined => "PARALLEL_BRANCH_UNJOINED",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single error or warning, located by a dot/bracket path into the input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub code: DiagnosticCode,
    pub path: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// A change applied to the document by a repair strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repair {
    pub path: String,
    pub original: serde_json::Value,
    pub repaired: serde_json::Value,
    pub reason: String,
}

/// The accumulated report of one compile call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<DiagnosticEntry>,
    pub warnings: Vec<DiagnosticEntry>,
    pub repairs: Vec<Repair>,
    pub artifact_refs: Vec<String>,
    pub hints: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(
        &mut self,
        code: DiagnosticCode,
        path: impl Into<String>,
        message: impl Into<String>,
        hint: Option<String>,
    ) {
        let entry = DiagnosticEntry {
            code,
            path: path.into(),
            message: message.into(),
            hint,
        };
        tracing::debug!(code = %entry.code, path = %entry.path, "{}", entry.message);
        self.errors.push(entry);
    }

    pub fn add_warning(
        &mut self,
        code: DiagnosticCode,
        path: impl Into<String>,
        message: impl Into<String>,
        hint: Option<String>,
    ) {
        let entry = DiagnosticEntry {
            code,
            path: path.into(),
            message: message.into(),
            hint,
        };
        tracing::debug!(code = %entry.code, path = %entry.path, "{}", entry.message);
        self.warnings.push(entry);
    }

    pub fn add_repair(
        &mut self,
        path: impl Into<String>,
        original: serde_json::Value,
        repaired: serde_json::Value,
        reason: impl Into<String>,
    ) {
        self.repairs.push(Repair {
            path: path.into(),
            original,
            repaired,
            reason: reason.into(),
        });
    }

    pub fn add_hint(&mut self, text: impl Into<String>) {
        self.hints.push(text.into());
    }

    pub fn add_artifact_ref(&mut self, reference: impl Into<String>) {
        self.artifact_refs.push(reference.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_success(&self) -> bool {
        !self.has_errors()
    }

    /// Errors carrying the given code.
    pub fn errors_with(&self, code: DiagnosticCode) -> Vec<&DiagnosticEntry> {
        self.errors.iter().filter(|e| e.code == code).collect()
    }

    /// Warnings carrying the given code.
    pub fn warnings_with(&self, code: DiagnosticCode) -> Vec<&DiagnosticEntry> {
        self.warnings.iter().filter(|w| w.code == code).collect()
    }

    /// Appends another report, e.g. to present both stages of a pipeline as one.
    pub fn merge(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.repairs.extend(other.repairs);
        self.artifact_refs.extend(other.artifact_refs);
        self.hints.extend(other.hints);
    }
}

impl fmt::Display for DiagnosticEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.path, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {})", hint)?;
        }
        Ok(())
    }
}

/// Renders the report in the order users read it: errors, warnings, repairs, hints.
impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "error {}", error)?;
        }
        for warning in &self.warnings {
            writeln!(f, "warning {}", warning)?;
        }
        for repair in &self.repairs {
            writeln!(
                f,
                "repair {}: {} -> {} ({})",
                repair.path, repair.original, repair.repaired, repair.reason
            )?;
        }
        for hint in &self.hints {
            writeln!(f, "hint {}", hint)?;
        }
        Ok(())
    }
}

/// What a compile stage hands back: the document, absent after a fatal failure, and the full report.
#[derive(Debug, Clone)]
pub struct CompileOutcome<T> {
    pub document: Option<T>,
    pub diagnostics: Diagnostics,
}

impl<T> CompileOutcome<T> {
    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    /// An outcome carrying nothing but the `INTERNAL_ERROR` for `err`.
    pub(crate) fn internal(err: CompileError) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_error(DiagnosticCode::InternalError, "", err.to_string(), None);
        Self {
            document: None,
            diagnostics,
        }
    }
}
