//! API documentation entity synthesis.
//!
//! Every served version of a definition is documented as a REST-like interface: a collection
//! path to list & create resources, an item path to read & delete them, and a component schema
//! built around the version's spec schema.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::detect::Detection;
use crate::error::TransformError;
use crate::params::NAME_PATTERN;
use crate::template::{self, EntityMetadata};
use crate::utils::MAX_NAME_LEN;
use crate::xrd::{ResourceDefinition, Version};

/// The API version of generated API entities.
pub const API_ENTITY_API_VERSION: &str = "backstage.io/v1alpha1";
/// The OpenAPI version of generated definitions.
pub const OPENAPI_VERSION: &str = "3.0.3";

/// A documentation entity describing a resource's schema as an API.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiEntity {
    pub api_version: String,
    pub kind: String,
    pub metadata: EntityMetadata,
    pub spec: ApiSpec,
}

/// The spec of an API entity.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ApiSpec {
    #[serde(rename = "type")]
    pub type_: String,
    pub lifecycle: String,
    pub owner: String,
    /// The OpenAPI document, as YAML text.
    pub definition: String,
}

/// Synthesizes API entities.
#[derive(Clone, Debug)]
pub struct ApiEntityBuilder {
    config: Arc<Config>,
}

impl ApiEntityBuilder {
    /// Create a new instance.
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Build the API entity of the given version.
    pub fn build(&self, xrd: &ResourceDefinition, version: &Version, detection: &Detection) -> Result<ApiEntity> {
        let config = &self.config;
        let kind = detection.resolved_kind(xrd);
        let document = self.document(xrd, version, detection)?;
        let definition = serde_yaml::to_string(&document)
            .map_err(|err| TransformError::Serialization(format!("OpenAPI definition of {}/{}: {}", xrd.name(), version.name, err)))?;

        let metadata = EntityMetadata {
            name: template::versioned_name(xrd, version, xrd.name()),
            title: format!("{} API ({})", kind, version.name),
            description: format!("{} resources of the {} API, version {}.", kind, xrd.spec.group, version.name),
            tags: template::entity_tags(config, xrd, version, detection),
            annotations: template::marker_annotations(config, xrd, version, detection),
            links: vec![],
        };
        Ok(ApiEntity {
            api_version: API_ENTITY_API_VERSION.into(),
            kind: "API".into(),
            metadata,
            spec: ApiSpec {
                type_: "openapi".into(),
                lifecycle: if version.deprecated { "deprecated".into() } else { "production".into() },
                owner: config.template_owner.clone().unwrap_or_else(|| config.default_owner.clone()),
                definition: definition.trim_start_matches("---\n").to_string(),
            },
        })
    }

    /// The OpenAPI document of the given version.
    pub fn document(&self, xrd: &ResourceDefinition, version: &Version, detection: &Detection) -> Result<Value> {
        let kind = detection.resolved_kind(xrd);
        let plural = detection.resolved_plural(xrd);
        let namespaced = detection.requires_namespace();
        let api_version = xrd.resource_api_version(version);

        let mut collection = format!("/apis/{}", api_version);
        if namespaced {
            collection.push_str("/namespaces/{namespace}");
        }
        collection.push_str(&format!("/{}", plural));
        let item = format!("{}/{{name}}", collection);

        let namespace_param = json!({"name": "namespace", "in": "path", "required": true, "schema": {"type": "string"}});
        let name_param = json!({"name": "name", "in": "path", "required": true, "schema": {"type": "string"}});
        let collection_params: Vec<Value> = if namespaced { vec![namespace_param.clone()] } else { vec![] };
        let item_params: Vec<Value> = collection_params.iter().cloned().chain([name_param]).collect();

        let schema_ref = json!({"$ref": format!("#/components/schemas/{}", kind)});
        let list_ref = json!({"$ref": format!("#/components/schemas/{}List", kind)});
        let single = |description: String| json!({"description": description, "content": {"application/json": {"schema": schema_ref.clone()}}});

        let mut paths = Map::new();
        paths.insert(
            collection,
            json!({
                "parameters": collection_params,
                "get": {
                    "summary": format!("List {} resources", kind),
                    "operationId": format!("list{}", kind),
                    "responses": {"200": {"description": format!("A list of {} resources.", kind), "content": {"application/json": {"schema": list_ref}}}},
                },
                "post": {
                    "summary": format!("Create a {}", kind),
                    "operationId": format!("create{}", kind),
                    "requestBody": {"required": true, "content": {"application/json": {"schema": schema_ref.clone()}}},
                    "responses": {"201": single(format!("The created {}.", kind))},
                },
            }),
        );
        paths.insert(
            item,
            json!({
                "parameters": item_params,
                "get": {
                    "summary": format!("Read a {}", kind),
                    "operationId": format!("read{}", kind),
                    "responses": {"200": single(format!("The requested {}.", kind)), "404": {"description": "Not found."}},
                },
                "delete": {
                    "summary": format!("Delete a {}", kind),
                    "operationId": format!("delete{}", kind),
                    "responses": {"200": single(format!("The deleted {}.", kind)), "404": {"description": "Not found."}},
                },
            }),
        );

        let mut schemas = Map::new();
        schemas.insert(kind.to_string(), self.resource_schema(version, kind, &api_version, namespaced)?);
        schemas.insert(
            format!("{}List", kind),
            json!({
                "type": "object",
                "required": ["items"],
                "properties": {
                    "apiVersion": {"type": "string"},
                    "kind": {"type": "string"},
                    "items": {"type": "array", "items": schema_ref},
                },
            }),
        );

        Ok(json!({
            "openapi": OPENAPI_VERSION,
            "info": {
                "title": format!("{} API", kind),
                "version": version.name,
                "description": format!("Synthesized from the {} resource definition.", xrd.name()),
            },
            "paths": paths,
            "components": {"schemas": schemas},
        }))
    }

    /// The component schema of a single resource.
    fn resource_schema(&self, version: &Version, kind: &str, api_version: &str, namespaced: bool) -> Result<Value> {
        let spec = match version.spec_schema() {
            Some(spec) => serde_json::to_value(spec).context("error serializing spec schema")?,
            None => json!({"type": "object"}),
        };
        let mut metadata_props = Map::new();
        metadata_props.insert("name".into(), json!({"type": "string", "pattern": NAME_PATTERN, "maxLength": MAX_NAME_LEN}));
        if namespaced {
            metadata_props.insert("namespace".into(), json!({"type": "string"}));
        }
        metadata_props.insert("labels".into(), json!({"type": "object", "additionalProperties": {"type": "string"}}));
        metadata_props.insert("annotations".into(), json!({"type": "object", "additionalProperties": {"type": "string"}}));

        Ok(json!({
            "type": "object",
            "required": ["apiVersion", "kind", "metadata", "spec"],
            "properties": {
                "apiVersion": {"type": "string", "enum": [api_version]},
                "kind": {"type": "string", "enum": [kind]},
                "metadata": {"type": "object", "required": ["name"], "properties": metadata_props},
                "spec": spec,
                "status": {
                    "type": "object",
                    "properties": {
                        "conditions": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "type": {"type": "string"},
                                    "status": {"type": "string"},
                                    "reason": {"type": "string"},
                                    "message": {"type": "string"},
                                    "lastTransitionTime": {"type": "string", "format": "date-time"},
                                },
                            },
                        },
                    },
                },
            },
        }))
    }
}
