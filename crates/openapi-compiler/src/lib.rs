//! `OpenAPI` -> MCP tool descriptor compiler.
//!
//! Takes a parsed `OpenAPI` 3.x document and produces one [`ToolDescriptor`] per operation:
//! a stable id, a friendly name, a description and a fully inlined JSON input schema. Security
//! schemes are normalized and mapped to the environment variables a generated server reads
//! credentials from.
//!
//! The crate does no I/O of its own (loading, hashing and emitting live in the CLI) and reports
//! everything non-fatal through [`CompileEvents`].

pub mod compiler;
pub mod config;
pub mod document;
pub mod env;
pub mod error;
pub mod events;
pub mod resolver;
pub mod schema;
pub mod security;
pub mod tool;

pub use compiler::{ToolCompiler, compile};
pub use config::{CompileOptions, DiscoverConfig, RefBodyMerge};
pub use document::{Document, HttpVerb};
pub use error::{CompileError, Result};
pub use events::{CompileEvents, CompileWarning, NoopEvents, TracingEvents};
pub use schema::SchemaNode;
pub use security::{CredentialMutation, SecurityScheme, apply_credentials};
pub use tool::{CompileOutput, ToolDescriptor};
