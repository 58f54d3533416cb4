//! Schema `$ref` resolver.
//!
//! Resolution is eager: every `#/components/schemas/*` reference reachable from the requested
//! schema is expanded in place, so callers receive a plain tree with no pointers left in it.
//!
//! Key detail: component graphs may be self- or mutually-referential. The resolver keeps the
//! names of the components currently being expanded (the active stack); meeting one of them
//! again yields a [`SchemaNode::recursive_placeholder`] instead of recursing, which bounds the
//! output depth.
//!
//! Only local references are supported. External files/URLs are out of scope for the compiler
//! (documents are expected to be bundled before compilation).

use crate::error::{CompileError, Result};
use crate::schema::{DEFAULT_TYPE, SchemaNode};
use indexmap::IndexMap;
use serde_json::Value;

/// Extract the component name from a local `#/components/<section>/<name>` reference.
///
/// JSON-pointer escapes (`~1` for `/`, `~0` for `~`) in the name are decoded.
///
/// # Errors
///
/// Returns [`CompileError::UnsupportedReference`] for external references, other sections, or
/// pointers that go deeper than the component itself.
pub fn component_name(reference: &str, section: &str) -> Result<String> {
    let unsupported = || CompileError::UnsupportedReference {
        reference: reference.to_string(),
        section: section.to_string(),
    };

    let pointer = reference.strip_prefix('#').ok_or_else(unsupported)?;
    let rest = pointer
        .strip_prefix("/components/")
        .and_then(|r| r.strip_prefix(section))
        .and_then(|r| r.strip_prefix('/'))
        .ok_or_else(unsupported)?;

    if rest.is_empty() || rest.contains('/') {
        return Err(unsupported());
    }

    Ok(rest.replace("~1", "/").replace("~0", "~"))
}

/// The `$ref` target of a reference-only schema object, if `raw` is one.
///
/// As in `OpenAPI` 3.0, sibling keywords next to `$ref` are ignored.
#[must_use]
pub fn reference_of(raw: &Value) -> Option<&str> {
    raw.as_object()
        .and_then(|o| o.get("$ref"))
        .and_then(Value::as_str)
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver<'a> {
    schemas: &'a IndexMap<String, Value>,
}

impl<'a> SchemaResolver<'a> {
    /// Create a resolver over a document's `components.schemas` table.
    #[must_use]
    pub fn new(schemas: &'a IndexMap<String, Value>) -> Self {
        Self { schemas }
    }

    /// Resolve a named schema component into a fully materialized tree.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::ComponentNotFound`] if the component (or any component it
    /// references) is not declared, or [`CompileError::UnsupportedReference`] for a non-local
    /// reference anywhere in the tree.
    pub fn resolve(&self, component: &str) -> Result<SchemaNode> {
        let mut stack = Vec::new();
        self.resolve_component(component, &format!("#/components/schemas/{component}"), &mut stack)
    }

    /// Resolve a `$ref` string such as `#/components/schemas/Pet`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::resolve`].
    pub fn resolve_ref(&self, reference: &str) -> Result<SchemaNode> {
        let name = component_name(reference, "schemas")?;
        let mut stack = Vec::new();
        self.resolve_component(&name, reference, &mut stack)
    }

    /// Materialize an inline schema object, expanding any references it contains.
    ///
    /// # Errors
    ///
    /// Same as [`Self::resolve`].
    pub fn resolve_inline(&self, raw: &Value) -> Result<SchemaNode> {
        let mut stack = Vec::new();
        self.materialize(raw, &mut stack)
    }

    fn resolve_component(
        &self,
        name: &str,
        reference: &str,
        stack: &mut Vec<String>,
    ) -> Result<SchemaNode> {
        if stack.iter().any(|s| s == name) {
            return Ok(SchemaNode::recursive_placeholder(name));
        }

        let raw = self
            .schemas
            .get(name)
            .ok_or_else(|| CompileError::ComponentNotFound {
                name: name.to_string(),
                reference: reference.to_string(),
            })?;

        stack.push(name.to_string());
        let resolved = self.materialize(raw, stack);
        stack.pop();
        resolved
    }

    fn materialize(&self, raw: &Value, stack: &mut Vec<String>) -> Result<SchemaNode> {
        if let Some(reference) = reference_of(raw) {
            let name = component_name(reference, "schemas")?;
            return self.resolve_component(&name, reference, stack);
        }

        let Some(obj) = raw.as_object() else {
            // `true`, `{}`-less shorthands and garbage all degrade to the default type.
            return Ok(SchemaNode::default());
        };

        let properties = obj.get("properties").and_then(Value::as_object);
        let mut node = SchemaNode::new(declared_type(obj.get("type")).unwrap_or_else(|| {
            if properties.is_some() {
                "object".to_string()
            } else {
                DEFAULT_TYPE.to_string()
            }
        }));

        node.description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        node.format = obj
            .get("format")
            .and_then(Value::as_str)
            .map(str::to_string);
        node.enumeration = obj.get("enum").and_then(Value::as_array).cloned();
        node.default = obj.get("default").cloned();

        if node.kind == "array"
            && let Some(items) = obj.get("items")
        {
            node.items = Some(Box::new(self.materialize(items, stack)?));
        }

        if let Some(properties) = properties {
            for (name, prop) in properties {
                let prop = self.materialize(prop, stack)?;
                node.insert_property(name.clone(), prop);
            }
        }

        if let Some(required) = obj.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                node.mark_required(name);
            }
        }

        Ok(node)
    }
}

/// `type` as a single string. `OpenAPI` 3.1 type arrays collapse to their first non-null entry.
fn declared_type(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schemas(value: Value) -> IndexMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    fn contains_ref(value: &Value) -> bool {
        match value {
            Value::Object(map) => map.contains_key("$ref") || map.values().any(contains_ref),
            Value::Array(items) => items.iter().any(contains_ref),
            _ => false,
        }
    }

    #[test]
    fn test_component_name() {
        assert_eq!(
            component_name("#/components/schemas/Pet", "schemas").unwrap(),
            "Pet"
        );
        assert_eq!(
            component_name("#/components/schemas/a~1b~0c", "schemas").unwrap(),
            "a/b~c"
        );
        assert!(component_name("./common.yaml#/components/schemas/Pet", "schemas").is_err());
        assert!(component_name("#/components/parameters/Pet", "schemas").is_err());
        assert!(component_name("#/components/schemas/Pet/properties/name", "schemas").is_err());
        assert!(component_name("#/components/schemas/", "schemas").is_err());
    }

    #[test]
    fn test_resolves_properties_enum_and_defaults() {
        let table = schemas(json!({
            "Pet": {
                "type": "object",
                "required": ["name", "ghost"],
                "properties": {
                    "name": { "type": "string", "description": "Pet name" },
                    "status": { "enum": ["available", "sold"] },
                    "age": { "type": "integer", "format": "int32" }
                }
            }
        }));
        let pet = SchemaResolver::new(&table).resolve("Pet").unwrap();

        assert_eq!(pet.kind, "object");
        assert_eq!(pet.required, vec!["name".to_string()]);
        let keys: Vec<_> = pet.properties.keys().cloned().collect();
        assert_eq!(keys, vec!["name", "status", "age"]);
        assert_eq!(pet.properties["name"].description.as_deref(), Some("Pet name"));
        assert_eq!(pet.properties["status"].kind, "string");
        assert_eq!(
            pet.properties["status"].enumeration,
            Some(vec![json!("available"), json!("sold")])
        );
        assert_eq!(pet.properties["age"].format.as_deref(), Some("int32"));
    }

    #[test]
    fn test_inlines_property_and_item_refs() {
        let table = schemas(json!({
            "Pet": {
                "type": "object",
                "properties": {
                    "category": { "$ref": "#/components/schemas/Category" },
                    "tags": { "type": "array", "items": { "$ref": "#/components/schemas/Tag" } },
                    "photoUrls": { "type": "array", "items": { "type": "string" } }
                }
            },
            "Category": {
                "type": "object",
                "properties": { "id": { "type": "integer" } }
            },
            "Tag": {
                "type": "object",
                "required": ["name"],
                "properties": { "name": { "type": "string" } }
            }
        }));
        let pet = SchemaResolver::new(&table).resolve("Pet").unwrap();

        assert_eq!(pet.properties["category"].properties["id"].kind, "integer");
        let tag = pet.properties["tags"].items.as_deref().unwrap();
        assert_eq!(tag.kind, "object");
        assert_eq!(tag.required, vec!["name".to_string()]);
        assert_eq!(
            pet.properties["photoUrls"].items.as_deref().unwrap().kind,
            "string"
        );
    }

    #[test]
    fn test_fully_inlines_acyclic_chain() {
        let depth = 6;
        let mut table = serde_json::Map::new();
        for i in 0..depth {
            let next = if i + 1 < depth {
                json!({ "$ref": format!("#/components/schemas/Level{}", i + 1) })
            } else {
                json!({ "type": "boolean" })
            };
            table.insert(
                format!("Level{i}"),
                json!({ "type": "object", "properties": { "child": next } }),
            );
        }
        let table = schemas(Value::Object(table));

        let root = SchemaResolver::new(&table).resolve("Level0").unwrap();
        let rendered = root.to_json();
        assert!(!contains_ref(&rendered));

        let mut node = &root;
        for _ in 0..depth {
            node = &node.properties["child"];
        }
        assert_eq!(node.kind, "boolean");
    }

    #[test]
    fn test_self_reference_terminates_with_placeholder() {
        let table = schemas(json!({
            "Node": {
                "type": "object",
                "properties": {
                    "value": { "type": "string" },
                    "next": { "$ref": "#/components/schemas/Node" },
                    "children": { "type": "array", "items": { "$ref": "#/components/schemas/Node" } }
                }
            }
        }));
        let node = SchemaResolver::new(&table).resolve("Node").unwrap();

        let next = &node.properties["next"];
        assert!(next.is_recursive_placeholder());
        assert_eq!(next.recursive_ref.as_deref(), Some("Node"));
        assert!(next.properties.is_empty());
        assert!(
            node.properties["children"]
                .items
                .as_deref()
                .unwrap()
                .is_recursive_placeholder()
        );
    }

    #[test]
    fn test_mutual_reference_terminates() {
        let table = schemas(json!({
            "Owner": {
                "type": "object",
                "properties": { "pets": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } } }
            },
            "Pet": {
                "type": "object",
                "properties": { "owner": { "$ref": "#/components/schemas/Owner" } }
            }
        }));
        let owner = SchemaResolver::new(&table).resolve("Owner").unwrap();

        let pet = owner.properties["pets"].items.as_deref().unwrap();
        assert!(!pet.is_recursive_placeholder());
        assert_eq!(
            pet.properties["owner"].recursive_ref.as_deref(),
            Some("Owner")
        );
    }

    #[test]
    fn test_sibling_refs_are_not_cycles() {
        let table = schemas(json!({
            "Pair": {
                "type": "object",
                "properties": {
                    "left": { "$ref": "#/components/schemas/Leaf" },
                    "right": { "$ref": "#/components/schemas/Leaf" }
                }
            },
            "Leaf": { "type": "object", "properties": { "v": { "type": "number" } } }
        }));
        let pair = SchemaResolver::new(&table).resolve("Pair").unwrap();
        assert!(!pair.properties["left"].is_recursive_placeholder());
        assert!(!pair.properties["right"].is_recursive_placeholder());
        assert_eq!(pair.properties["right"].properties["v"].kind, "number");
    }

    #[test]
    fn test_missing_component_is_an_error() {
        let table = schemas(json!({
            "Pet": { "type": "object", "properties": { "owner": { "$ref": "#/components/schemas/Owner" } } }
        }));
        let err = SchemaResolver::new(&table).resolve("Pet").unwrap_err();
        assert!(matches!(
            err,
            CompileError::ComponentNotFound { ref name, .. } if name == "Owner"
        ));

        let err = SchemaResolver::new(&table).resolve("Nope").unwrap_err();
        assert!(matches!(err, CompileError::ComponentNotFound { .. }));
    }

    #[test]
    fn test_external_ref_is_unsupported() {
        let table = schemas(json!({
            "Pet": { "type": "object", "properties": { "owner": { "$ref": "./owner.yaml" } } }
        }));
        let err = SchemaResolver::new(&table).resolve("Pet").unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedReference { .. }));
    }

    #[test]
    fn test_type_inference() {
        let table = IndexMap::new();
        let resolver = SchemaResolver::new(&table);
        assert_eq!(resolver.resolve_inline(&json!({})).unwrap().kind, "string");
        assert_eq!(
            resolver
                .resolve_inline(&json!({ "properties": { "a": {} } }))
                .unwrap()
                .kind,
            "object"
        );
        assert_eq!(
            resolver
                .resolve_inline(&json!({ "type": ["null", "integer"] }))
                .unwrap()
                .kind,
            "integer"
        );
    }
}
