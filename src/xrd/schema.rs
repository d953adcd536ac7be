//! OpenAPI v3 schema nodes of definition versions.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node of an OpenAPI v3 schema tree.
///
/// Only the subset of the schema language relevant to parameter forms & manifests is modelled
/// explicitly; every other keyword is retained in `extra` so that a node serializes back
/// verbatim.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Child properties, in declaration order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_: Option<Vec<Value>>,
    /// Human readable labels of the `enum` values, in the same order.
    #[serde(rename = "x-enum-labels", default, skip_serializing_if = "Option::is_none")]
    pub enum_labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SchemaNode {
    /// Look up a direct child property.
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties.get(name)
    }

    /// The type tag of this node, defaulting to `object` when properties are declared.
    pub fn type_name(&self) -> &str {
        match self.type_.as_deref() {
            Some(type_) => type_,
            None if !self.properties.is_empty() => "object",
            None => "",
        }
    }

    /// Whether this node is an object with declared properties.
    pub fn is_object(&self) -> bool {
        self.type_name() == "object" && !self.properties.is_empty()
    }

    /// Whether this node is an array of objects with declared properties.
    pub fn is_array_of_objects(&self) -> bool {
        self.type_name() == "array" && self.items.as_deref().map(SchemaNode::is_object).unwrap_or(false)
    }

    /// Whether the given property is required by this node.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|req| req == name)
    }
}
