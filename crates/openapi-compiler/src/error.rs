//! Error types for `unrelated-openapi-compiler`.

use thiserror::Error;

/// Main error type for a compile pass.
///
/// Every variant is fatal: the pass aborts and no partial tool set is returned. Recoverable
/// conditions (missing `paths`, malformed parameters, unsupported security schemes) are
/// reported as [`crate::events::CompileWarning`]s instead.
#[derive(Error, Debug)]
pub enum CompileError {
    /// A `$ref` points at a schema component that is not declared.
    #[error("Schema component not found: '{name}' (referenced as '{reference}')")]
    ComponentNotFound { name: String, reference: String },

    /// A `$ref` that is not a local `#/components/<section>/<name>` pointer.
    #[error("Unsupported $ref '{reference}' (expected '#/components/{section}/<name>')")]
    UnsupportedReference { reference: String, section: String },

    /// The document (or a part the compiler walks) has the wrong shape.
    #[error("Invalid OpenAPI document: {0}")]
    InvalidDocument(String),

    /// Document text could not be parsed as JSON or YAML.
    #[error("Failed to parse OpenAPI document: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// JSON conversion errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for compiler operations.
pub type Result<T> = std::result::Result<T, CompileError>;
