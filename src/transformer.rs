//! Definition transformation orchestration.
//!
//! The transformer runs the pipeline once per served version of a definition. Each version's
//! template and API entity are built independently: a failure while building one artifact is
//! logged and that artifact is skipped, while every other artifact is still produced.

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::api::{ApiEntity, ApiEntityBuilder};
use crate::config::Config;
use crate::detect::{Detection, Dialect, VersionDetector};
use crate::error::TransformError;
use crate::params::ParameterExtractor;
use crate::steps::{self, ClaimStepGenerator, DirectStepGenerator, StepGenerator};
use crate::template::{Template, TemplateBuilder};
use crate::xrd::{ResourceDefinition, ResourceScope, Version};

/// A generated entity.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Entity {
    Template(Box<Template>),
    Api(Box<ApiEntity>),
}

impl Entity {
    /// The name of this entity.
    pub fn name(&self) -> &str {
        match self {
            Self::Template(template) => &template.metadata.name,
            Self::Api(api) => &api.metadata.name,
        }
    }

    /// The template held by this entity, if it is one.
    pub fn as_template(&self) -> Option<&Template> {
        match self {
            Self::Template(template) => Some(template),
            Self::Api(_) => None,
        }
    }

    /// The API entity held by this entity, if it is one.
    pub fn as_api(&self) -> Option<&ApiEntity> {
        match self {
            Self::Template(_) => None,
            Self::Api(api) => Some(api),
        }
    }
}

/// Which artifacts a transformation produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// Templates & API entities.
    Combined,
    /// Templates only.
    TemplatesOnly,
    /// API entities only.
    ApiEntitiesOnly,
}

impl OutputMode {
    fn templates(&self) -> bool {
        matches!(self, Self::Combined | Self::TemplatesOnly)
    }

    fn api_entities(&self) -> bool {
        matches!(self, Self::Combined | Self::ApiEntitiesOnly)
    }
}

/// A summary of what a transformation of a definition would produce.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub dialect: Dialect,
    pub scope: ResourceScope,
    pub uses_claims: bool,
    pub requires_namespace: bool,
    pub multi_cluster: bool,
    pub resolved_kind: String,
    pub versions: Vec<VersionSummary>,
}

/// A summary of one version of a definition.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub name: String,
    pub served: bool,
    pub deprecated: bool,
    pub has_schema: bool,
}

/// Transforms resource definitions into templates & API entities.
///
/// An instance holds only immutable configuration, and may be shared freely across threads.
#[derive(Clone, Debug)]
pub struct XrdTransformer {
    config: Arc<Config>,
    detector: VersionDetector,
    extractor: ParameterExtractor,
    claim_steps: ClaimStepGenerator,
    direct_steps: DirectStepGenerator,
    templates: TemplateBuilder,
    api_entities: ApiEntityBuilder,
}

impl XrdTransformer {
    /// Create a new instance, refusing configurations with problems.
    pub fn new(config: Config) -> Result<Self> {
        let problems = steps::validate_config(&config);
        if !problems.is_empty() {
            bail!(TransformError::InvalidConfig(problems));
        }
        let config = Arc::new(config);
        Ok(Self {
            detector: VersionDetector,
            extractor: ParameterExtractor::new(config.clone()),
            claim_steps: ClaimStepGenerator::new(config.clone()),
            direct_steps: DirectStepGenerator::new(config.clone()),
            templates: TemplateBuilder::new(config.clone()),
            api_entities: ApiEntityBuilder::new(config.clone()),
            config,
        })
    }

    /// The configuration of this transformer.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Transform the given definition into templates & API entities.
    pub fn transform(&self, xrd: &ResourceDefinition) -> Vec<Entity> {
        self.transform_with(xrd, OutputMode::Combined)
    }

    /// Transform the given definition into the templates of its served versions.
    pub fn templates(&self, xrd: &ResourceDefinition) -> Vec<Template> {
        self.transform_with(xrd, OutputMode::TemplatesOnly)
            .into_iter()
            .filter_map(|entity| match entity {
                Entity::Template(template) => Some(*template),
                Entity::Api(_) => None,
            })
            .collect()
    }

    /// Transform the given definition into the API entities of its served versions.
    pub fn api_entities(&self, xrd: &ResourceDefinition) -> Vec<ApiEntity> {
        self.transform_with(xrd, OutputMode::ApiEntitiesOnly)
            .into_iter()
            .filter_map(|entity| match entity {
                Entity::Template(_) => None,
                Entity::Api(api) => Some(*api),
            })
            .collect()
    }

    /// Transform every given definition, in order.
    ///
    /// A definition which cannot be transformed contributes nothing, and never prevents the
    /// others from being transformed.
    pub fn transform_all<'a>(&self, xrds: impl IntoIterator<Item = &'a ResourceDefinition>, mode: OutputMode) -> Vec<Entity> {
        xrds.into_iter().flat_map(|xrd| self.transform_with(xrd, mode)).collect()
    }

    /// Transform the given definition, producing the artifacts selected by `mode`.
    ///
    /// Per served version, the template precedes the API entity in the output.
    #[tracing::instrument(level = "debug", skip(self, xrd), fields(xrd = %xrd.name()))]
    pub fn transform_with(&self, xrd: &ResourceDefinition, mode: OutputMode) -> Vec<Entity> {
        let reasons = self.can_transform(xrd);
        if !reasons.is_empty() {
            let err = TransformError::InvalidDefinition(reasons);
            tracing::warn!(error = %err, xrd = %xrd.name(), "skipping resource definition");
            return vec![];
        }

        let detection = self.detector.detect(xrd);
        let mut entities = vec![];
        for version in xrd.served_versions() {
            tracing::debug!(xrd = %xrd.name(), version = %version.name, variant = ?detection.variant(), "transforming version");
            if mode.templates() {
                match self.build_template(xrd, version, &detection) {
                    Ok(template) => entities.push(Entity::Template(Box::new(template))),
                    Err(err) => tracing::warn!(error = ?err, xrd = %xrd.name(), version = %version.name, "skipping template of version"),
                }
            }
            if mode.api_entities() {
                match self.api_entities.build(xrd, version, &detection) {
                    Ok(api) => entities.push(Entity::Api(Box::new(api))),
                    Err(err) => tracing::warn!(error = ?err, xrd = %xrd.name(), version = %version.name, "skipping API entity of version"),
                }
            }
        }
        tracing::info!(xrd = %xrd.name(), entities = entities.len(), "transformed resource definition");
        entities
    }

    /// Build & validate the template of a single version.
    pub fn build_template(&self, xrd: &ResourceDefinition, version: &Version, detection: &Detection) -> Result<Template> {
        let sections = self.extractor.extract(xrd, version, detection);
        let generator = self.step_generator(detection);
        let steps = generator.generate(xrd, version, detection, &sections)?;
        let template = self.templates.build(xrd, version, detection, sections, steps);
        let violations = self.templates.validate(&template);
        if !violations.is_empty() {
            bail!(TransformError::InvalidTemplate {
                name: template.metadata.name,
                violations,
            });
        }
        Ok(template)
    }

    /// The step generator handling definitions of the given detection.
    pub fn step_generator(&self, detection: &Detection) -> &dyn StepGenerator {
        steps::select(detection, &self.claim_steps, &self.direct_steps)
    }

    /// Summarize what transforming the given definition would produce, without generating
    /// anything.
    pub fn preview(&self, xrd: &ResourceDefinition) -> Preview {
        let detection = self.detector.detect(xrd);
        Preview {
            dialect: detection.dialect,
            scope: detection.scope,
            uses_claims: detection.uses_claims,
            requires_namespace: detection.requires_namespace(),
            multi_cluster: xrd.clusters.len() > 1,
            resolved_kind: detection.resolved_kind(xrd).to_string(),
            versions: xrd
                .spec
                .versions
                .iter()
                .map(|version| VersionSummary {
                    name: version.name.clone(),
                    served: version.served,
                    deprecated: version.deprecated,
                    has_schema: version.has_schema(),
                })
                .collect(),
        }
    }

    /// Check whether the given definition can be transformed, returning every reason it cannot.
    ///
    /// An empty output means the definition is structurally sound.
    pub fn can_transform(&self, xrd: &ResourceDefinition) -> Vec<String> {
        let mut reasons = vec![];
        if xrd.name().trim().is_empty() {
            reasons.push("definition has no name".to_string());
        }
        if xrd.spec.group.trim().is_empty() {
            reasons.push("definition has no group".into());
        }
        if xrd.spec.names.kind.trim().is_empty() {
            reasons.push("definition has no kind".into());
        }
        if xrd.spec.versions.is_empty() {
            reasons.push("definition has no versions".into());
        } else if xrd.served_versions().next().is_none() {
            reasons.push("definition has no served versions".into());
        }
        for version in xrd.served_versions().filter(|version| !version.has_schema()) {
            reasons.push(format!("served version `{}` has no schema", version.name));
        }
        reasons
    }
}
