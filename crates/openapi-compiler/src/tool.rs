//! Compiler output: tool descriptors and the boundary contract handed to generators.

use crate::document::{HttpVerb, SecurityRequirement};
use crate::env::{API_BASE_URL, API_HEADERS};
use crate::events::CompileWarning;
use crate::schema::SchemaNode;
use crate::security::{SecurityScheme, env_names_for};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static PATH_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]*)\}").expect("valid path param regex"));
static NON_ID_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9-]").expect("valid id regex"));

/// One callable tool derived from a single HTTP operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// `VERB-cleaned-path`, unique per (verb, path).
    pub id: String,
    /// Friendly name: operationId, else summary, else `"VERB path"`.
    pub name: String,
    pub description: String,
    pub method: HttpVerb,
    /// Path template with `{param}` placeholders.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Always `type: object`.
    pub input_schema: SchemaNode,
    /// Requirement alternatives (OR'd); schemes inside one alternative are AND'd.
    pub security: Vec<SecurityRequirement>,
}

/// Everything a compile pass produces.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    /// Tools in path-then-verb declaration order.
    pub tools: Vec<ToolDescriptor>,
    pub security_schemes: IndexMap<String, SecurityScheme>,
    pub warnings: Vec<CompileWarning>,
}

impl CompileOutput {
    /// Environment variables a generated server reads, in a stable order: the base URL and
    /// static headers first, then per-scheme credentials in scheme declaration order.
    #[must_use]
    pub fn required_env_vars(&self) -> Vec<String> {
        let mut vars = vec![API_BASE_URL.to_string(), API_HEADERS.to_string()];
        for (name, scheme) in &self.security_schemes {
            for var in env_names_for(name, scheme) {
                if !vars.contains(&var) {
                    vars.push(var);
                }
            }
        }
        vars
    }

    #[must_use]
    pub fn tool(&self, id: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.id == id)
    }
}

/// Derive the tool id for an operation.
///
/// A single leading `/` is stripped, braces around path parameters are removed, and every
/// character outside `[A-Za-z0-9-]` becomes `-`. The verb prefix keeps ids distinct for
/// operations sharing a path.
#[must_use]
pub fn tool_id(verb: HttpVerb, path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = PATH_PARAM.replace_all(path, "$1");
    let raw = format!("{}-{}", verb.as_upper(), path);
    NON_ID_CHAR.replace_all(&raw, "-").into_owned()
}

/// First non-empty of operationId, summary, then `"VERB path"`.
#[must_use]
pub fn friendly_name(
    operation_id: Option<&str>,
    summary: Option<&str>,
    verb: HttpVerb,
    path: &str,
) -> String {
    operation_id
        .filter(|s| !s.is_empty())
        .or_else(|| summary.filter(|s| !s.is_empty()))
        .map_or_else(|| format!("{verb} {path}"), str::to_string)
}

/// First non-empty of description, summary, then `"Calls VERB path"`.
#[must_use]
pub fn tool_description(
    description: Option<&str>,
    summary: Option<&str>,
    verb: HttpVerb,
    path: &str,
) -> String {
    description
        .filter(|s| !s.is_empty())
        .or_else(|| summary.filter(|s| !s.is_empty()))
        .map_or_else(|| format!("Calls {verb} {path}"), str::to_string)
}
