//! Permissive, typed view over a raw `OpenAPI` document.
//!
//! Only the parts the compiler walks are modeled. Fields are optional wherever real-world specs
//! omit them, and anything the compiler does not interpret is kept as a raw [`Value`]. Maps are
//! [`IndexMap`]s because declaration order is observable in the compiler output.

use crate::error::{CompileError, Result};
use crate::resolver::component_name;
use crate::schema::SchemaNode;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// One security requirement alternative: scheme name -> scopes.
///
/// All schemes of an alternative must be satisfied together; alternatives are OR'd.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// `None` when the document has no `paths` key at all.
    #[serde(default)]
    pub paths: Option<IndexMap<String, PathItem>>,
    #[serde(default)]
    pub components: Components,
    /// Document-wide default security requirements.
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, Value>,
    #[serde(default)]
    pub security_schemes: IndexMap<String, Value>,
    #[serde(default)]
    pub parameters: IndexMap<String, Value>,
    #[serde(default)]
    pub request_bodies: IndexMap<String, Value>,
}

/// A path item: shared parameters plus every other key (operations and ignored keys alike).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    #[serde(default, deserialize_with = "lenient_list")]
    pub parameters: Vec<Value>,
    #[serde(flatten)]
    pub entries: IndexMap<String, Value>,
}

impl Document {
    /// Parse document text. JSON is a valid subset of YAML, so `serde_yaml` covers both.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON/YAML or does not have the document shape.
    pub fn from_text(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text)?;
        Self::from_value(value)
    }

    /// Interpret an already-parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidDocument`] if the root is not a mapping or one of the
    /// modeled sections has the wrong shape.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(CompileError::InvalidDocument(
                "document root must be a mapping".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| CompileError::InvalidDocument(e.to_string()))
    }

    /// Whether the document declares at least one path.
    #[must_use]
    pub fn has_paths(&self) -> bool {
        self.paths.as_ref().is_some_and(|p| !p.is_empty())
    }
}

impl Components {
    /// Look up `#/components/parameters/<name>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is not a local parameter pointer.
    pub fn parameter(&self, reference: &str) -> Result<Option<&Value>> {
        let name = component_name(reference, "parameters")?;
        Ok(self.parameters.get(&name))
    }

    /// Look up `#/components/requestBodies/<name>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is not a local request body pointer or the request body
    /// is not declared.
    pub fn request_body(&self, reference: &str) -> Result<&Value> {
        let name = component_name(reference, "requestBodies")?;
        self.request_bodies
            .get(&name)
            .ok_or_else(|| CompileError::ComponentNotFound {
                name,
                reference: reference.to_string(),
            })
    }
}

/// HTTP verbs recognized as operation keys of a path item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpVerb {
    /// Parse a path item key. Keys are matched exactly (`OpenAPI` keys are lowercase).
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "delete" => Some(Self::Delete),
            "patch" => Some(Self::Patch),
            "options" => Some(Self::Options),
            "head" => Some(Self::Head),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_upper(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
        }
    }

    /// Verbs whose request body is folded into the tool input schema.
    #[must_use]
    pub fn accepts_request_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upper())
    }
}

impl PathItem {
    /// Operations in declaration order. Non-verb keys (`summary`, `servers`, `x-*`, ...) are
    /// not operations and are skipped.
    pub fn operations(&self) -> impl Iterator<Item = (HttpVerb, &Value)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| HttpVerb::from_key(key).map(|verb| (verb, value)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub operation_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub parameters: Vec<Value>,
    #[serde(default)]
    pub request_body: Option<Value>,
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,
}

impl Operation {
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidDocument`] if the operation is not a mapping of the expected
    /// shape.
    pub fn from_value(verb: HttpVerb, path: &str, value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(value).map_err(|e| {
            CompileError::InvalidDocument(format!("operation {verb} {path}: {e}"))
        })
    }
}

/// A list that may be written as `null` (an empty YAML key) or as a non-list; both read as empty.
fn lenient_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<Value>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

/// Free text that is not a string (`summary: 2024`, `description: null`) counts as absent.
fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Where a parameter is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Cookie,
}

impl ParameterLocation {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "path" => Some(Self::Path),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }
}

/// A parameter object exactly as declared, every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawParameter {
    #[serde(default, rename = "$ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "in")]
    pub location: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default)]
    pub schema: Option<Value>,
}

/// A parameter that passed validation; its schema is still raw.
#[derive(Debug, Clone)]
pub struct ValidParameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub description: Option<String>,
    pub schema: Option<Value>,
}

/// A parameter after validation and schema resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: SchemaNode,
}

/// Why a declared parameter does not contribute to the input schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Malformed,
    MissingName,
    MissingLocation,
    UnknownLocation(String),
    UnresolvedReference(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => f.write_str("parameter is not a well-formed object"),
            Self::MissingName => f.write_str("parameter has no 'name'"),
            Self::MissingLocation => f.write_str("parameter has no 'in'"),
            Self::UnknownLocation(loc) => write!(f, "unknown parameter location '{loc}'"),
            Self::UnresolvedReference(r) => write!(f, "unresolved parameter $ref '{r}'"),
        }
    }
}

/// Outcome of validating one declared parameter.
#[derive(Debug, Clone)]
pub enum ParameterDecision {
    Accept(ValidParameter),
    Skip(SkipReason),
}

impl RawParameter {
    /// Validate a declared parameter, following a `#/components/parameters/*` reference first.
    #[must_use]
    pub fn decide(value: &Value, components: &Components) -> ParameterDecision {
        let Ok(raw) = RawParameter::deserialize(value) else {
            return ParameterDecision::Skip(SkipReason::Malformed);
        };

        if let Some(reference) = &raw.reference {
            return match components.parameter(reference) {
                Ok(Some(target)) => match RawParameter::deserialize(target) {
                    // Nested parameter refs are not followed.
                    Ok(target) if target.reference.is_none() => target.validate(),
                    _ => ParameterDecision::Skip(SkipReason::UnresolvedReference(
                        reference.clone(),
                    )),
                },
                Ok(None) | Err(_) => {
                    ParameterDecision::Skip(SkipReason::UnresolvedReference(reference.clone()))
                }
            };
        }

        raw.validate()
    }

    fn validate(self) -> ParameterDecision {
        let Some(name) = self.name.filter(|n| !n.is_empty()) else {
            return ParameterDecision::Skip(SkipReason::MissingName);
        };
        let Some(loc) = self.location else {
            return ParameterDecision::Skip(SkipReason::MissingLocation);
        };
        let Some(location) = ParameterLocation::parse(&loc) else {
            return ParameterDecision::Skip(SkipReason::UnknownLocation(loc));
        };

        // Path parameters are always required.
        let required = location == ParameterLocation::Path || self.required.unwrap_or(false);

        ParameterDecision::Accept(ValidParameter {
            name,
            location,
            required,
            description: self.description,
            schema: self.schema,
        })
    }
}
