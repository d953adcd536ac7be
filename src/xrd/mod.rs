//! Composite resource definition (XRD) data model.
//!
//! These types mirror the XRD objects served by clusters, plus the fields attached by the
//! multi-cluster fetcher (`clusters` & `clusterName`). They are immutable inputs to the
//! transformer and are never mutated by it.
//!
//! References:
//! - https://docs.crossplane.io/latest/concepts/composite-resource-definitions/
//! - https://kubernetes.io/docs/tasks/extend-kubernetes/custom-resources/custom-resource-definitions/

mod schema;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

pub use schema::SchemaNode;

/// The API group & version prefix used by definitions of the modern dialect.
pub const MODERN_API_VERSION_PREFIX: &str = "apiextensions.crossplane.io/v2";

/// A composite resource definition, as handed over by the fetcher.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    /// The API version marker of the definition object, which signals its dialect.
    #[serde(default)]
    pub api_version: String,
    /// The kind of the definition object.
    #[serde(default)]
    pub kind: String,
    /// Standard object metadata. The name is the definition's identifier.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// The definition spec.
    #[serde(default)]
    pub spec: DefinitionSpec,

    /// The clusters which resources of this definition may target.
    #[serde(default)]
    pub clusters: Vec<String>,
    /// The cluster from which this definition was fetched.
    #[serde(default)]
    pub cluster_name: Option<String>,
}

/// The spec of a composite resource definition.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSpec {
    /// The API group of the defined resources.
    #[serde(default)]
    pub group: String,
    /// The names of the composite resource.
    #[serde(default)]
    pub names: ResourceNames,
    /// The names of the claim, if claims are offered.
    #[serde(default)]
    pub claim_names: Option<ResourceNames>,
    /// The declared scope, absent on legacy definitions.
    #[serde(default)]
    pub scope: Option<ResourceScope>,
    /// The schema versions of the defined resources, in declared order.
    #[serde(default)]
    pub versions: Vec<Version>,
    /// The composition used when a resource does not select one itself.
    #[serde(default)]
    pub default_composition_ref: Option<CompositionRef>,
}

/// Kind & naming forms of a resource.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNames {
    /// The kind, e.g. `XDatabase`.
    #[serde(default)]
    pub kind: String,
    /// The plural form, e.g. `xdatabases`.
    #[serde(default)]
    pub plural: String,
    /// The singular form, e.g. `xdatabase`.
    #[serde(default)]
    pub singular: Option<String>,
    /// The kind of the list type.
    #[serde(default)]
    pub list_kind: Option<String>,
}

/// The scope of the defined resources.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum ResourceScope {
    /// Resources are cluster scoped.
    Cluster,
    /// Resources live in a namespace.
    Namespaced,
    /// Cluster scoped resources which keep the legacy claim-based behavior.
    LegacyCluster,
}

impl std::fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Cluster => "Cluster",
                Self::Namespaced => "Namespaced",
                Self::LegacyCluster => "LegacyCluster",
            }
        )
    }
}

/// A reference to a composition by name.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CompositionRef {
    /// The name of the composition.
    pub name: String,
}

/// One schema version of a definition.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    /// The version name, e.g. `v1alpha1`.
    #[serde(default)]
    pub name: String,
    /// Whether this version is exposed for active use.
    #[serde(default)]
    pub served: bool,
    /// Whether this version is deprecated.
    #[serde(default)]
    pub deprecated: bool,
    /// Whether compositions may reference this version.
    #[serde(default)]
    pub referenceable: bool,
    /// The version's schema.
    #[serde(default)]
    pub schema: Option<VersionSchema>,
}

/// The schema wrapper of a version.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct VersionSchema {
    /// The OpenAPI v3 schema of the whole resource object.
    #[serde(rename = "openAPIV3Schema", default)]
    pub open_api_v3_schema: Option<SchemaNode>,
}

impl Version {
    /// The schema of the resource's `spec`, if declared.
    pub fn spec_schema(&self) -> Option<&SchemaNode> {
        self.schema
            .as_ref()
            .and_then(|schema| schema.open_api_v3_schema.as_ref())
            .and_then(|root| root.property("spec"))
    }

    /// Whether this version declares a spec schema with at least one field.
    pub fn has_spec_fields(&self) -> bool {
        self.spec_schema().map(|spec| !spec.properties.is_empty()).unwrap_or(false)
    }

    /// Whether this version declares any schema at all.
    pub fn has_schema(&self) -> bool {
        self.schema.as_ref().and_then(|schema| schema.open_api_v3_schema.as_ref()).is_some()
    }
}

impl ResourceDefinition {
    /// Parse a definition from a YAML document.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        use anyhow::Context;
        serde_yaml::from_str(yaml).context("error parsing resource definition yaml")
    }

    /// The identifier of this definition.
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Look up an annotation of this definition.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(key))
            .map(|val| val.as_str())
            .filter(|val| !val.trim().is_empty())
    }

    /// The versions of this definition which are served.
    pub fn served_versions(&self) -> impl Iterator<Item = &Version> {
        self.spec.versions.iter().filter(|version| version.served)
    }

    /// Whether this definition declares more than one schema version.
    pub fn has_multiple_versions(&self) -> bool {
        self.spec.versions.len() > 1
    }

    /// The name of the default composition, if declared.
    pub fn default_composition(&self) -> Option<&str> {
        self.spec
            .default_composition_ref
            .as_ref()
            .map(|reference| reference.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// The API version string of resources of the given schema version.
    pub fn resource_api_version(&self, version: &Version) -> String {
        format!("{}/{}", self.spec.group, version.name)
    }
}
