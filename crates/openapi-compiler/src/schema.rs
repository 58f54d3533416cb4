//! Materialized schema trees.
//!
//! A [`SchemaNode`] is a fully expanded JSON Schema subset: references have already been inlined
//! by the resolver, so the tree never contains `$ref`. The only back-reference that can appear is
//! the cycle placeholder produced by [`SchemaNode::recursive_placeholder`].

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

/// JSON type used when a schema does not declare one.
pub const DEFAULT_TYPE: &str = "string";

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// JSON Schema `type` (`string`, `integer`, `object`, ...).
    pub kind: String,
    pub description: Option<String>,
    pub format: Option<String>,
    pub enumeration: Option<Vec<Value>>,
    pub default: Option<Value>,
    /// Item schema, only meaningful for `type: array`.
    pub items: Option<Box<SchemaNode>>,
    /// Property schemas in declaration order.
    pub properties: IndexMap<String, SchemaNode>,
    /// Required property names, in declaration order, without duplicates.
    ///
    /// Invariant: every entry is a key of `properties`.
    pub required: Vec<String>,
    /// Set only on cycle placeholders: the component that was already being expanded.
    pub recursive_ref: Option<String>,
}

impl SchemaNode {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: None,
            format: None,
            enumeration: None,
            default: None,
            items: None,
            properties: IndexMap::new(),
            required: Vec::new(),
            recursive_ref: None,
        }
    }

    /// An empty `type: object` node (the starting point of every tool input schema).
    #[must_use]
    pub fn object() -> Self {
        Self::new("object")
    }

    /// Bounded stand-in for a component that is already on the resolution stack.
    #[must_use]
    pub fn recursive_placeholder(component: &str) -> Self {
        let mut node = Self::object();
        node.description = Some(format!("Recursive reference to {component}"));
        node.recursive_ref = Some(component.to_string());
        node
    }

    #[must_use]
    pub fn is_recursive_placeholder(&self) -> bool {
        self.recursive_ref.is_some()
    }

    /// Insert (or replace) a property, keeping the original position on replacement.
    pub fn insert_property(&mut self, name: impl Into<String>, schema: SchemaNode) {
        self.properties.insert(name.into(), schema);
    }

    /// Mark a property as required.
    ///
    /// Names that are not declared properties are ignored, which keeps the
    /// `required ⊆ properties` invariant regardless of input quality.
    pub fn mark_required(&mut self, name: &str) {
        if self.properties.contains_key(name) && !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }

    /// Required names that are not declared properties. Empty for every node this crate builds.
    pub fn undeclared_required(&self) -> impl Iterator<Item = &str> {
        self.required
            .iter()
            .filter(|r| !self.properties.contains_key(r.as_str()))
            .map(String::as_str)
    }

    /// Merge `other` over `self` at the top level, last write wins.
    ///
    /// `type`, `properties` and `required` are always taken from `other`; optional keywords are
    /// only taken when `other` sets them. Properties collected on `self` beforehand are dropped.
    pub fn merge_over(&mut self, other: SchemaNode) {
        self.kind = other.kind;
        self.properties = other.properties;
        self.required = other.required;
        if other.description.is_some() {
            self.description = other.description;
        }
        if other.format.is_some() {
            self.format = other.format;
        }
        if other.enumeration.is_some() {
            self.enumeration = other.enumeration;
        }
        if other.default.is_some() {
            self.default = other.default;
        }
        if other.items.is_some() {
            self.items = other.items;
        }
        if other.recursive_ref.is_some() {
            self.recursive_ref = other.recursive_ref;
        }
    }

    /// Property-level union: properties of `other` are added (overwriting same-named ones) and
    /// its required names appended.
    pub fn union_with(&mut self, other: SchemaNode) {
        let SchemaNode {
            properties,
            required,
            ..
        } = other;
        for (name, schema) in properties {
            self.insert_property(name, schema);
        }
        for name in &required {
            self.mark_required(name);
        }
    }

    /// Render as a JSON Schema value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("type".to_string(), json!(self.kind));
        if let Some(desc) = &self.description {
            out.insert("description".to_string(), json!(desc));
        }
        if let Some(format) = &self.format {
            out.insert("format".to_string(), json!(format));
        }
        if let Some(values) = &self.enumeration {
            out.insert("enum".to_string(), Value::Array(values.clone()));
        }
        if let Some(default) = &self.default {
            out.insert("default".to_string(), default.clone());
        }
        if let Some(items) = &self.items {
            out.insert("items".to_string(), items.to_json());
        }
        // Object schemas always advertise `properties` (MCP clients expect it on input schemas).
        if self.kind == "object" || !self.properties.is_empty() {
            let props: Map<String, Value> = self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect();
            out.insert("properties".to_string(), Value::Object(props));
        }
        if !self.required.is_empty() {
            out.insert("required".to_string(), json!(self.required));
        }
        if let Some(component) = &self.recursive_ref {
            out.insert("x-recursive-ref".to_string(), json!(component));
        }
        Value::Object(out)
    }
}

impl Default for SchemaNode {
    fn default() -> Self {
        Self::new(DEFAULT_TYPE)
    }
}

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pet() -> SchemaNode {
        let mut pet = SchemaNode::object();
        pet.insert_property("name", SchemaNode::new("string"));
        pet.insert_property("tag", SchemaNode::new("string"));
        pet.mark_required("name");
        pet
    }

    #[test]
    fn mark_required_ignores_unknown_and_duplicate_names() {
        let mut node = pet();
        node.mark_required("name");
        node.mark_required("missing");
        assert_eq!(node.required, vec!["name".to_string()]);
        assert_eq!(node.undeclared_required().count(), 0);
    }

    #[test]
    fn merge_over_replaces_properties_and_required() {
        let mut input = SchemaNode::object();
        input.insert_property("petId", SchemaNode::new("string"));
        input.mark_required("petId");

        input.merge_over(pet());

        let keys: Vec<_> = input.properties.keys().cloned().collect();
        assert_eq!(keys, vec!["name", "tag"]);
        assert_eq!(input.required, vec!["name".to_string()]);
    }

    #[test]
    fn merge_over_keeps_description_when_other_has_none() {
        let mut input = SchemaNode::object();
        input.description = Some("input".to_string());
        input.merge_over(pet());
        assert_eq!(input.description.as_deref(), Some("input"));
    }

    #[test]
    fn union_with_keeps_existing_properties() {
        let mut input = SchemaNode::object();
        input.insert_property("petId", SchemaNode::new("string"));
        input.mark_required("petId");

        input.union_with(pet());

        let keys: Vec<_> = input.properties.keys().cloned().collect();
        assert_eq!(keys, vec!["petId", "name", "tag"]);
        assert_eq!(input.required, vec!["petId".to_string(), "name".to_string()]);
    }

    #[test]
    fn to_json_preserves_property_order_and_omits_empty_keywords() {
        let mut node = SchemaNode::object();
        node.insert_property("zeta", SchemaNode::new("integer"));
        node.insert_property("alpha", SchemaNode::new("boolean"));

        let value = node.to_json();
        let keys: Vec<_> = value["properties"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert!(value.get("required").is_none());
        assert!(value["properties"]["zeta"].get("properties").is_none());
    }

    #[test]
    fn placeholder_serializes_marker() {
        let value = serde_json::to_value(SchemaNode::recursive_placeholder("Node")).unwrap();
        assert_eq!(value["type"], "object");
        assert_eq!(value["x-recursive-ref"], "Node");
        assert_eq!(value["description"], "Recursive reference to Node");
    }
}
