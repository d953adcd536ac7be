//! Parameter form extraction.
//!
//! A version's spec schema is walked into the parameter sections of a request form. Walking is
//! fold-style: every call returns its own accumulator, nothing is shared or mutated in place.
//!
//! Object fields are expanded [`MAX_NESTED_DEPTH`] level(s) deep, and deeper objects are left out
//! of the form. Manifest generation derives the resource's `spec` from these sections, so the
//! same depth boundary applies there.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::config::Config;
use crate::detect::Detection;
use crate::expr::{Expr, Reference};
use crate::utils;
use crate::xrd::{ResourceDefinition, SchemaNode, Version};

/// The number of object levels below the top-level fields which are expanded.
pub const MAX_NESTED_DEPTH: usize = 1;

pub const SECTION_METADATA: &str = "Resource Metadata";
pub const SECTION_CONFIGURATION: &str = "Resource Configuration";
pub const SECTION_PUBLISHING: &str = "Publishing Configuration";

pub const PARAM_NAME: &str = "xrName";
pub const PARAM_OWNER: &str = "owner";
pub const PARAM_NAMESPACE: &str = "namespace";
pub const PARAM_CLUSTER: &str = "cluster";
pub const PARAM_PUSH: &str = "pushToGit";
pub const PARAM_REPO_URL: &str = "repoUrl";
pub const PARAM_BRANCH: &str = "targetBranch";
pub const PARAM_CREATE_PR: &str = "createPr";

/// The pattern which resource names must match.
pub const NAME_PATTERN: &str = "^[a-z0-9]([-a-z0-9]*[a-z0-9])?$";
/// The namespace offered by default.
pub const DEFAULT_NAMESPACE: &str = "default";

/// One section (page) of a parameter form.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSection {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    pub properties: Properties,
}

/// The descriptor of a single form field.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    pub title: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Expr>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Child fields of an expanded object.
    #[serde(skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Item descriptor of an array.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterDescriptor>>,
    /// UI hints, keyed by their full `ui:*` key.
    #[serde(flatten)]
    pub ui: BTreeMap<String, Value>,
}

/// An insertion-ordered map of field name to descriptor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Properties(Vec<(String, ParameterDescriptor)>);

impl Properties {
    /// Return these properties with the given field appended.
    pub fn with(mut self, name: impl Into<String>, descriptor: ParameterDescriptor) -> Self {
        self.0.push((name.into(), descriptor));
        self
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.0.iter().find(|(key, _)| key == name).map(|(_, descriptor)| descriptor)
    }

    /// Whether a field of the given name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over the fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterDescriptor)> {
        self.0.iter().map(|(key, descriptor)| (key.as_str(), descriptor))
    }

    /// The field names, in order.
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(key, _)| key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, descriptor) in self.0.iter() {
            map.serialize_entry(key, descriptor)?;
        }
        map.end()
    }
}

impl ParameterSection {
    /// Whether this section carries the given field.
    pub fn has(&self, name: &str) -> bool {
        self.properties.contains(name)
    }
}

/// Find a section by title.
pub fn find_section<'a>(sections: &'a [ParameterSection], title: &str) -> Option<&'a ParameterSection> {
    sections.iter().find(|section| section.title == title)
}

/// Walks version schemas into parameter sections.
#[derive(Clone, Debug)]
pub struct ParameterExtractor {
    config: Arc<Config>,
}

impl ParameterExtractor {
    /// Create a new instance.
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Extract the ordered parameter sections of the given version.
    pub fn extract(&self, xrd: &ResourceDefinition, version: &Version, detection: &Detection) -> Vec<ParameterSection> {
        let mut sections = vec![self.metadata_section(xrd, detection)];
        if let Some(section) = self.configuration_section(version) {
            sections.push(section);
        }
        if self.config.publish_enabled {
            sections.push(self.publishing_section());
        }
        sections
    }

    /// The resource metadata section: name, owner, and namespace & cluster where applicable.
    fn metadata_section(&self, xrd: &ResourceDefinition, detection: &Detection) -> ParameterSection {
        let name = ParameterDescriptor {
            title: "Name".into(),
            type_: "string".into(),
            description: Some("The name of the resource. Lowercase letters, digits & hyphens only.".into()),
            pattern: Some(NAME_PATTERN.into()),
            min_length: Some(1),
            max_length: Some(utils::MAX_NAME_LEN as u64),
            ..Default::default()
        };
        let owner = ParameterDescriptor {
            title: "Owner".into(),
            type_: "string".into(),
            description: Some("The owner of the resource.".into()),
            default: Some(Expr::str(self.config.default_owner.clone())),
            ui: ui(&[("ui:field", json!("OwnerPicker")), ("ui:options", json!({"catalogFilter": {"kind": ["Group", "User"]}}))]),
            ..Default::default()
        };
        let mut required = vec![PARAM_NAME.to_string(), PARAM_OWNER.to_string()];
        let mut properties = Properties::default().with(PARAM_NAME, name).with(PARAM_OWNER, owner);

        if detection.requires_namespace() {
            let namespace = ParameterDescriptor {
                title: "Namespace".into(),
                type_: "string".into(),
                description: Some("The namespace in which the resource is created.".into()),
                default: Some(Expr::str(DEFAULT_NAMESPACE)),
                pattern: Some(NAME_PATTERN.into()),
                max_length: Some(utils::MAX_NAME_LEN as u64),
                ..Default::default()
            };
            properties = properties.with(PARAM_NAMESPACE, namespace);
            required.push(PARAM_NAMESPACE.into());
        }

        if xrd.clusters.len() > 1 {
            let cluster = ParameterDescriptor {
                title: "Cluster".into(),
                type_: "string".into(),
                description: Some("The cluster in which the resource is created.".into()),
                default: xrd.clusters.first().cloned().map(Expr::str),
                enum_: Some(xrd.clusters.iter().cloned().map(Value::String).collect()),
                ..Default::default()
            };
            properties = properties.with(PARAM_CLUSTER, cluster);
            required.push(PARAM_CLUSTER.into());
        }

        ParameterSection {
            title: SECTION_METADATA.into(),
            description: Some("Identity & ownership of the resource.".into()),
            required,
            properties,
        }
    }

    /// The resource configuration section, derived from the version's spec schema.
    fn configuration_section(&self, version: &Version) -> Option<ParameterSection> {
        if !version.has_spec_fields() {
            return None;
        }
        let spec = version.spec_schema()?;
        let properties = self.describe_fields(spec, 0);
        let required = required_fields(spec, &properties);
        Some(ParameterSection {
            title: SECTION_CONFIGURATION.into(),
            description: spec.description.clone(),
            required,
            properties,
        })
    }

    /// Describe every field of the given object node which fits within the depth policy.
    fn describe_fields(&self, node: &SchemaNode, depth: usize) -> Properties {
        node.properties.iter().fold(Properties::default(), |acc, (key, child)| match self.describe(key, child, depth) {
            Some(descriptor) => acc.with(key.clone(), descriptor),
            None => acc,
        })
    }

    /// Describe a single field, or `None` when it lies beyond the expansion depth.
    fn describe(&self, key: &str, node: &SchemaNode, depth: usize) -> Option<ParameterDescriptor> {
        let (type_, properties, required, items) = if node.is_object() {
            if depth >= MAX_NESTED_DEPTH {
                return None;
            }
            let properties = self.describe_fields(node, depth + 1);
            let required = required_fields(node, &properties);
            ("object".to_string(), properties, required, None)
        } else if node.is_array_of_objects() {
            if depth >= MAX_NESTED_DEPTH {
                return None;
            }
            let item_node = node.items.as_deref()?;
            let properties = self.describe_fields(item_node, depth + 1);
            let item = ParameterDescriptor {
                title: utils::humanize(key),
                type_: "object".into(),
                required: required_fields(item_node, &properties),
                properties,
                ..Default::default()
            };
            ("array".to_string(), Properties::default(), vec![], Some(Box::new(item)))
        } else if node.type_name() == "array" {
            let item = node.items.as_deref().map(|item| ParameterDescriptor {
                title: utils::humanize(key),
                type_: map_type(item).into(),
                enum_: item.enum_.clone(),
                ..Default::default()
            });
            ("array".to_string(), Properties::default(), vec![], item.map(Box::new))
        } else {
            (map_type(node).to_string(), Properties::default(), vec![], None)
        };

        Some(ParameterDescriptor {
            title: node
                .extra
                .get("title")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| utils::humanize(key)),
            type_,
            description: node.description.clone(),
            default: node.default.as_ref().map(|default| self.map_default(default)),
            enum_: node.enum_.clone(),
            enum_names: node.enum_labels.clone(),
            pattern: node.pattern.clone(),
            minimum: node.minimum,
            maximum: node.maximum,
            min_length: node.min_length,
            max_length: node.max_length,
            properties,
            required,
            items,
            ui: BTreeMap::new(),
        })
    }

    /// Map a schema default into a form default, rewriting placeholders when configured.
    fn map_default(&self, default: &Value) -> Expr {
        if self.config.default_placeholders {
            if let Some(target) = default.as_str().and_then(utils::placeholder_target) {
                return Expr::Ref(Reference::param_path(target.split('.')));
            }
        }
        Expr::Literal(default.clone())
    }

    /// The publishing configuration section.
    fn publishing_section(&self) -> ParameterSection {
        let git = self.config.git_target();
        let push = ParameterDescriptor {
            title: "Push to Git".into(),
            type_: "boolean".into(),
            description: Some("Publish the resource manifest to a GitOps repository instead of applying it directly.".into()),
            default: Some(Expr::bool(false)),
            ..Default::default()
        };
        let repo_url = ParameterDescriptor {
            title: "Repository Location".into(),
            type_: "string".into(),
            description: Some("The repository which receives the manifest.".into()),
            default: git.map(|git| git.repo_url.clone()).filter(|url| !url.is_empty()).map(Expr::str),
            ui: ui(&[("ui:field", json!("RepoUrlPicker"))]),
            ..Default::default()
        };
        let branch = ParameterDescriptor {
            title: "Target Branch".into(),
            type_: "string".into(),
            description: Some("The branch which receives the manifest.".into()),
            default: Some(Expr::str(git.map(|git| git.branch.clone()).unwrap_or_else(|| "main".into()))),
            ..Default::default()
        };
        let create_pr = ParameterDescriptor {
            title: "Create Pull Request".into(),
            type_: "boolean".into(),
            description: Some("Open a pull request instead of committing directly to the target branch.".into()),
            default: Some(Expr::bool(true)),
            ..Default::default()
        };
        ParameterSection {
            title: SECTION_PUBLISHING.into(),
            description: Some("GitOps publishing of the resource manifest.".into()),
            required: vec![],
            properties: Properties::default()
                .with(PARAM_PUSH, push)
                .with(PARAM_REPO_URL, repo_url)
                .with(PARAM_BRANCH, branch)
                .with(PARAM_CREATE_PR, create_pr),
        }
    }
}

/// The described fields which the given node requires, in form order.
fn required_fields(node: &SchemaNode, properties: &Properties) -> Vec<String> {
    properties.names().into_iter().filter(|name| node.is_required(name)).map(String::from).collect()
}

/// Map a schema node's type onto a form field type.
fn map_type(node: &SchemaNode) -> &'static str {
    match node.type_name() {
        "integer" | "number" => "number",
        "boolean" => "boolean",
        "array" => "array",
        _ => "string",
    }
}

fn ui(hints: &[(&str, Value)]) -> BTreeMap<String, Value> {
    hints.iter().map(|(key, val)| (key.to_string(), val.clone())).collect()
}
