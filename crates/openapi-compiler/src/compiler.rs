//! `OpenAPI` → tool descriptor compilation.
//!
//! One synchronous pass over a [`Document`]: every recognized operation becomes a
//! [`ToolDescriptor`] whose input schema merges path-item parameters, operation parameters and
//! (for post/put/patch) the JSON request body. Output order follows the document: paths in
//! declaration order, verbs in declaration order within each path.

use crate::config::{CompileOptions, RefBodyMerge};
use crate::document::{
    Document, HttpVerb, Operation, ParameterDecision, ParameterDescriptor, ParameterLocation,
    PathItem, RawParameter, ValidParameter,
};
use crate::error::Result;
use crate::events::{CompileEvents, CompileWarning, TracingEvents};
use crate::resolver::{SchemaResolver, reference_of};
use crate::schema::SchemaNode;
use crate::security::SecurityScheme;
use crate::tool::{CompileOutput, ToolDescriptor, friendly_name, tool_description, tool_id};
use indexmap::IndexMap;
use serde_json::Value;

/// Compile with default options, reporting through `tracing`.
///
/// # Errors
///
/// See [`ToolCompiler::compile`].
pub fn compile(document: &Document) -> Result<CompileOutput> {
    let events = TracingEvents::default();
    ToolCompiler::new(CompileOptions::default(), &events).compile(document)
}

pub struct ToolCompiler<'a> {
    options: CompileOptions,
    events: &'a dyn CompileEvents,
}

struct OperationInput<'d> {
    verb: HttpVerb,
    path: &'d str,
    path_item: &'d PathItem,
    operation: Operation,
}

impl<'a> ToolCompiler<'a> {
    #[must_use]
    pub fn new(options: CompileOptions, events: &'a dyn CompileEvents) -> Self {
        Self { options, events }
    }

    #[must_use]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile every operation of `document`.
    ///
    /// A document without paths is not an error: the result has no tools and carries a
    /// [`CompileWarning::DocumentShape`].
    ///
    /// # Errors
    ///
    /// Fails the whole pass (no partial tool list) if a schema or request body `$ref` cannot be
    /// resolved, or if an operation is not a mapping.
    pub fn compile(&self, document: &Document) -> Result<CompileOutput> {
        let mut warnings = Vec::new();
        let security_schemes = self.collect_security_schemes(document, &mut warnings);

        let Some(paths) = document.paths.as_ref().filter(|p| !p.is_empty()) else {
            self.push_warning(
                &mut warnings,
                CompileWarning::DocumentShape {
                    message: "no paths found in OpenAPI document; no tools generated".to_string(),
                },
            );
            return Ok(CompileOutput {
                tools: Vec::new(),
                security_schemes,
                warnings,
            });
        };

        let resolver = SchemaResolver::new(&document.components.schemas);
        let mut tools: IndexMap<String, ToolDescriptor> = IndexMap::new();

        for (path, path_item) in paths {
            for (verb, raw_operation) in path_item.operations() {
                if !self.options.discover.allows(&format!("{verb} {path}")) {
                    self.events.operation_filtered(verb, path);
                    continue;
                }

                let input = OperationInput {
                    verb,
                    path,
                    path_item,
                    operation: Operation::from_value(verb, path, raw_operation)?,
                };
                let tool = self.compile_operation(document, &resolver, input)?;
                self.events.tool_compiled(&tool);

                // Ids are distinct per (verb, path); should two still collide, the later
                // operation wins and keeps the earlier position.
                if let Some(previous) = tools.insert(tool.id.clone(), tool) {
                    self.events.duplicate_tool_id(&previous.id);
                }
            }
        }

        Ok(CompileOutput {
            tools: tools.into_values().collect(),
            security_schemes,
            warnings,
        })
    }

    fn push_warning(&self, warnings: &mut Vec<CompileWarning>, warning: CompileWarning) {
        self.events.warning(&warning);
        warnings.push(warning);
    }

    fn collect_security_schemes(
        &self,
        document: &Document,
        warnings: &mut Vec<CompileWarning>,
    ) -> IndexMap<String, SecurityScheme> {
        let mut schemes = IndexMap::new();
        for (name, raw) in &document.components.security_schemes {
            match SecurityScheme::from_value(raw) {
                Ok(scheme) => {
                    if !scheme.is_supported() {
                        self.push_warning(
                            warnings,
                            CompileWarning::UnsupportedSecurityScheme {
                                scheme: name.clone(),
                                scheme_type: scheme.type_label(),
                            },
                        );
                    }
                    schemes.insert(name.clone(), scheme);
                }
                Err(reason) => self.push_warning(
                    warnings,
                    CompileWarning::InvalidSecurityScheme {
                        scheme: name.clone(),
                        reason,
                    },
                ),
            }
        }
        schemes
    }

    fn compile_operation(
        &self,
        document: &Document,
        resolver: &SchemaResolver<'_>,
        input: OperationInput<'_>,
    ) -> Result<ToolDescriptor> {
        let OperationInput {
            verb,
            path,
            path_item,
            operation,
        } = input;

        let mut input_schema = SchemaNode::object();

        let parameters = self.collect_parameters(
            document,
            resolver,
            verb,
            path,
            &path_item.parameters,
            &operation.parameters,
        )?;
        for param in parameters {
            input_schema.insert_property(param.name.clone(), param.schema);
            if param.required {
                input_schema.mark_required(&param.name);
            }
        }

        if verb.accepts_request_body()
            && let Some(body) = &operation.request_body
        {
            self.merge_request_body(document, resolver, &mut input_schema, body)?;
        }

        let security = operation
            .security
            .clone()
            .or_else(|| document.security.clone())
            .unwrap_or_default();

        Ok(ToolDescriptor {
            id: tool_id(verb, path),
            name: friendly_name(
                operation.operation_id.as_deref(),
                operation.summary.as_deref(),
                verb,
                path,
            ),
            description: tool_description(
                operation.description.as_deref(),
                operation.summary.as_deref(),
                verb,
                path,
            ),
            method: verb,
            path: path.to_string(),
            operation_id: operation.operation_id.clone(),
            input_schema,
            security,
        })
    }

    /// Validate and resolve path-item and operation parameters.
    ///
    /// Path-item parameters come first; an operation parameter with the same `(name, in)`
    /// replaces the shared one in place. Malformed parameters are dropped.
    fn collect_parameters(
        &self,
        document: &Document,
        resolver: &SchemaResolver<'_>,
        verb: HttpVerb,
        path: &str,
        path_item_params: &[Value],
        operation_params: &[Value],
    ) -> Result<Vec<ParameterDescriptor>> {
        let mut merged: IndexMap<(String, ParameterLocation), ValidParameter> = IndexMap::new();

        for raw in path_item_params.iter().chain(operation_params) {
            match RawParameter::decide(raw, &document.components) {
                ParameterDecision::Accept(param) => {
                    merged.insert((param.name.clone(), param.location), param);
                }
                ParameterDecision::Skip(reason) => {
                    self.events.parameter_skipped(verb, path, &reason);
                }
            }
        }

        merged
            .into_values()
            .map(|param| {
                let schema = parameter_schema(resolver, &param)?;
                Ok(ParameterDescriptor {
                    name: param.name,
                    location: param.location,
                    required: param.required,
                    schema,
                })
            })
            .collect()
    }

    fn merge_request_body(
        &self,
        document: &Document,
        resolver: &SchemaResolver<'_>,
        input_schema: &mut SchemaNode,
        body: &Value,
    ) -> Result<()> {
        let body = match reference_of(body) {
            Some(reference) => document.components.request_body(reference)?,
            None => body,
        };

        let Some(schema) = body
            .get("content")
            .and_then(|c| c.get(&self.options.request_body_media_type))
            .and_then(|m| m.get("schema"))
        else {
            return Ok(());
        };

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, raw) in properties {
                let mut prop = resolver.resolve_inline(raw)?;
                if prop.description.is_none() {
                    prop.description = Some(format!("{name} parameter"));
                }
                input_schema.insert_property(name.clone(), prop);
            }
            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for name in required.iter().filter_map(Value::as_str) {
                    input_schema.mark_required(name);
                }
            }
        } else if let Some(reference) = reference_of(schema) {
            let resolved = resolver.resolve_ref(reference)?;
            // Only object bodies can stand in for tool arguments.
            if resolved.kind != "object" {
                return Ok(());
            }
            match self.options.ref_body_merge {
                RefBodyMerge::Replace => input_schema.merge_over(resolved),
                RefBodyMerge::Union => input_schema.union_with(resolved),
            }
        }

        Ok(())
    }
}

/// Input property for one parameter: its resolved schema, described by the parameter's own
/// description or `"<name> parameter"`. The schema's description never shows through.
fn parameter_schema(resolver: &SchemaResolver<'_>, param: &ValidParameter) -> Result<SchemaNode> {
    let mut schema = match &param.schema {
        Some(raw) => resolver.resolve_inline(raw)?,
        None => SchemaNode::default(),
    };
    schema.description = Some(
        param
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("{} parameter", param.name)),
    );
    Ok(schema)
}
