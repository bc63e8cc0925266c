use thiserror::Error;

/// Unexpected failures inside a compile call.
///
/// These never escape `compile()`: they are caught at the top of each stage and
/// reported as a single `INTERNAL_ERROR` diagnostic.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Document at '{path}' does not match the expected shape: {source}")]
    MalformedDocument {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to convert '{what}' to JSON: {source}")]
    Serialization {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while loading host input files.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A parameter value that could not be converted to its declared catalog type.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Cannot coerce {found} to {expected}")]
pub struct CoercionError {
    pub expected: &'static str,
    pub found: serde_json::Value,
}
