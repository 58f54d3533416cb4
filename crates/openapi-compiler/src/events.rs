//! Structured reporting for compile passes.
//!
//! The compiler never writes to stdout/stderr directly. It reports through an injected
//! [`CompileEvents`] implementation; [`TracingEvents`] forwards to `tracing`, tests record.

use crate::document::{HttpVerb, SkipReason};
use crate::tool::ToolDescriptor;
use serde::Serialize;
use std::fmt;

/// Non-fatal conditions surfaced alongside the compile output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CompileWarning {
    /// The document has no `paths`; the tool list is empty.
    DocumentShape { message: String },
    /// oauth2 / openIdConnect (or an unknown http scheme): no credentials are derived and the
    /// operator has to inject a static header via `API_HEADERS`.
    UnsupportedSecurityScheme { scheme: String, scheme_type: String },
    /// A declared security scheme could not be interpreted and is left out of the map.
    InvalidSecurityScheme { scheme: String, reason: String },
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DocumentShape { message } => f.write_str(message),
            Self::UnsupportedSecurityScheme {
                scheme,
                scheme_type,
            } => write!(
                f,
                "security scheme '{scheme}' ({scheme_type}) is not supported; set a static \
                 Authorization header via API_HEADERS instead"
            ),
            Self::InvalidSecurityScheme { scheme, reason } => {
                write!(f, "ignoring security scheme '{scheme}': {reason}")
            }
        }
    }
}

/// Sink for compile-time events.
pub trait CompileEvents {
    fn warning(&self, warning: &CompileWarning);

    /// A declared parameter was dropped. Silent by default.
    fn parameter_skipped(&self, _verb: HttpVerb, _path: &str, _reason: &SkipReason) {}

    /// An operation was filtered out by the discovery config.
    fn operation_filtered(&self, _verb: HttpVerb, _path: &str) {}

    fn tool_compiled(&self, _tool: &ToolDescriptor) {}

    /// Two operations produced the same tool id; the later one replaced the earlier.
    fn duplicate_tool_id(&self, _id: &str) {}
}

/// Default sink: structured `tracing` events tagged with the document source.
#[derive(Debug, Clone)]
pub struct TracingEvents {
    source: String,
}

impl TracingEvents {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl Default for TracingEvents {
    fn default() -> Self {
        Self::new("openapi")
    }
}

impl CompileEvents for TracingEvents {
    fn warning(&self, warning: &CompileWarning) {
        tracing::warn!(source = %self.source, warning = %warning, "OpenAPI compile warning");
    }

    fn parameter_skipped(&self, verb: HttpVerb, path: &str, reason: &SkipReason) {
        tracing::debug!(
            source = %self.source,
            operation = %format!("{verb} {path}"),
            reason = %reason,
            "skipping parameter"
        );
    }

    fn operation_filtered(&self, verb: HttpVerb, path: &str) {
        tracing::debug!(
            source = %self.source,
            operation = %format!("{verb} {path}"),
            "operation excluded by discover config"
        );
    }

    fn tool_compiled(&self, tool: &ToolDescriptor) {
        tracing::trace!(source = %self.source, tool = %tool.id, name = %tool.name, "compiled tool");
    }

    fn duplicate_tool_id(&self, id: &str) {
        tracing::warn!(source = %self.source, tool = %id, "duplicate tool id; keeping the later operation");
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl CompileEvents for NoopEvents {
    fn warning(&self, _warning: &CompileWarning) {}
}
