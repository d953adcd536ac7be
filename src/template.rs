//! Request template assembly & validation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::detect::Detection;
use crate::expr::{Expr, Reference, Segment};
use crate::params::{self, ParameterSection};
use crate::steps::{self, ProvisioningStep};
use crate::utils;
use crate::xrd::{ResourceDefinition, Version};

/// The API version of generated templates.
pub const TEMPLATE_API_VERSION: &str = "scaffolder.backstage.io/v1beta3";
/// The template type of generated templates.
pub const TEMPLATE_TYPE: &str = "crossplane-resource";
/// Tags carried by every generated entity.
pub const DEFAULT_TAGS: &[&str] = &["crossplane"];

/// A self-service request template.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub api_version: String,
    pub kind: String,
    pub metadata: EntityMetadata,
    pub spec: TemplateSpec,
}

/// Metadata shared by all generated entities.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct EntityMetadata {
    pub name: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

/// A link shown on an entity's page.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Link {
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// The spec of a template.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TemplateSpec {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub parameters: Vec<ParameterSection>,
    pub steps: Vec<ProvisioningStep>,
    pub output: TemplateOutput,
}

/// What a template shows once it has run.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct TemplateOutput {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<OutputLink>,
    pub text: Vec<OutputText>,
}

/// A link shown once a template has run.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputLink {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_ref: Option<Expr>,
}

/// A block of text shown once a template has run.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct OutputText {
    pub title: String,
    pub content: Expr,
}

impl Template {
    /// Find a parameter section by title.
    pub fn section(&self, title: &str) -> Option<&ParameterSection> {
        params::find_section(&self.spec.parameters, title)
    }

    /// Find a step by ID.
    pub fn step(&self, id: &str) -> Option<&ProvisioningStep> {
        self.spec.steps.iter().find(|step| step.id == id)
    }
}

/// The name of the template generated for the given version.
///
/// The normalized plural (or the `template-name` annotation), suffixed with the version name
/// when the definition declares more than one version.
pub fn template_name(config: &Config, xrd: &ResourceDefinition, version: &Version, detection: &Detection) -> String {
    let base = xrd
        .annotation(&config.annotation("template-name"))
        .unwrap_or_else(|| detection.resolved_plural(xrd));
    versioned_name(xrd, version, base)
}

/// Normalize the given base name, suffixing the version when the definition has several.
pub(crate) fn versioned_name(xrd: &ResourceDefinition, version: &Version, base: &str) -> String {
    let base = utils::normalize_name(base);
    if !xrd.has_multiple_versions() {
        return base;
    }
    let suffix = utils::normalize_name(&version.name);
    let room = utils::MAX_NAME_LEN.saturating_sub(suffix.len() + 1);
    let base: String = base.chars().take(room).collect();
    utils::normalize_name(&format!("{}-{}", base, suffix))
}

/// The tags of every entity generated for the given version.
pub(crate) fn entity_tags(config: &Config, xrd: &ResourceDefinition, version: &Version, detection: &Detection) -> Vec<String> {
    let custom = xrd
        .annotation(&config.annotation("tags"))
        .map(|tags| tags.split(',').map(String::from).collect::<Vec<_>>())
        .unwrap_or_default();
    let deprecated = if version.deprecated { Some("deprecated".to_string()) } else { None };
    DEFAULT_TAGS
        .iter()
        .map(|tag| tag.to_string())
        .chain(config.additional_tags.iter().cloned())
        .chain([detection.dialect.tag().to_string(), detection.scope_tag().to_string()])
        .chain(deprecated)
        .chain(custom)
        .filter_map(|tag| utils::normalize_tag(&tag))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The annotations linking an entity to its definition & describing its variant.
pub(crate) fn marker_annotations(config: &Config, xrd: &ResourceDefinition, version: &Version, detection: &Detection) -> BTreeMap<String, String> {
    let mut annotations = maplit::btreemap! {
        config.annotation("xrd") => xrd.name().to_string(),
        config.annotation("xrd-group") => xrd.spec.group.clone(),
        config.annotation("xrd-version") => version.name.clone(),
        config.annotation("dialect") => detection.dialect.to_string(),
        config.annotation("scope") => detection.scope.to_string(),
        config.annotation("uses-claims") => detection.uses_claims.to_string(),
    };
    if let Some(cluster) = xrd.cluster_name.as_ref() {
        annotations.insert(config.annotation("source-cluster"), cluster.clone());
    }
    if version.deprecated {
        annotations.insert(config.annotation("deprecated"), "true".into());
    }
    annotations
}

/// Assembles request templates.
#[derive(Clone, Debug)]
pub struct TemplateBuilder {
    config: Arc<Config>,
}

impl TemplateBuilder {
    /// Create a new instance.
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Assemble the template of the given version from its sections & steps.
    ///
    /// The output is not validated, see [`TemplateBuilder::validate`].
    pub fn build(
        &self, xrd: &ResourceDefinition, version: &Version, detection: &Detection, sections: Vec<ParameterSection>, steps: Vec<ProvisioningStep>,
    ) -> Template {
        let metadata = self.metadata(xrd, version, detection);
        let output = self.output(xrd, detection, &steps);
        Template {
            api_version: TEMPLATE_API_VERSION.into(),
            kind: "Template".into(),
            metadata,
            spec: TemplateSpec {
                type_: TEMPLATE_TYPE.into(),
                owner: self.config.template_owner.clone(),
                parameters: sections,
                steps,
                output,
            },
        }
    }

    /// Check the given template against the structural rules every template must satisfy,
    /// returning every violation found.
    ///
    /// Step inputs may only reference declared parameters, and outputs of steps which run
    /// before them.
    pub fn validate(&self, template: &Template) -> Vec<String> {
        let mut violations = vec![];
        let meta = &template.metadata;
        if meta.name.is_empty() {
            violations.push("template name must not be empty".to_string());
        } else if !utils::is_valid_name(&meta.name) {
            violations.push(format!("template name `{}` must match the pattern `{}`", meta.name, utils::RE_ENTITY_NAME.as_str()));
        }
        if meta.title.trim().is_empty() {
            violations.push("template title must not be empty".into());
        }
        if template.spec.type_.trim().is_empty() {
            violations.push("template type must not be empty".into());
        }

        if template.spec.parameters.is_empty() {
            violations.push("template must have at least one parameter section".into());
        }
        for (idx, section) in template.spec.parameters.iter().enumerate() {
            if section.title.trim().is_empty() {
                violations.push(format!("parameter section {} must have a title", idx));
            }
            if section.properties.is_empty() {
                violations.push(format!("parameter section {} must have at least one property", idx));
            }
        }

        if template.spec.steps.is_empty() {
            violations.push("template must have at least one step".into());
        }
        let declared: BTreeSet<&str> = template.spec.parameters.iter().flat_map(|section| section.properties.names()).collect();
        for (idx, step) in template.spec.steps.iter().enumerate() {
            if step.id.trim().is_empty() {
                violations.push(format!("step {} must have an id", idx));
            }
            if step.action.trim().is_empty() {
                violations.push(format!("step {} must have an action", idx));
            }
            let earlier = &template.spec.steps[..idx];
            for reference in step.input.values().flat_map(Expr::references) {
                match reference {
                    Reference::Parameter(path) => {
                        let root = path.first().map(String::as_str).unwrap_or_default();
                        if !declared.contains(root) {
                            violations.push(format!("step {} references undeclared parameter `{}`", idx, reference.expression()));
                        }
                    }
                    Reference::StepOutput { step: target, .. } => {
                        if !earlier.iter().any(|prev| &prev.id == target) {
                            violations.push(format!("step {} references output of step `{}` which does not run before it", idx, target));
                        }
                    }
                    Reference::User(_) => (),
                }
            }
        }
        violations
    }

    fn metadata(&self, xrd: &ResourceDefinition, version: &Version, detection: &Detection) -> EntityMetadata {
        let config = &self.config;
        let kind = detection.resolved_kind(xrd);
        let title = xrd
            .annotation(&config.annotation("template-title"))
            .map(String::from)
            .unwrap_or_else(|| format!("Create {}", kind));
        let title = if xrd.has_multiple_versions() { format!("{} ({})", title, version.name) } else { title };
        let description = xrd
            .annotation(&config.annotation("template-description"))
            .map(String::from)
            .unwrap_or_else(|| format!("Request a new {} resource ({}).", kind, xrd.resource_api_version(version)));

        let mut annotations = marker_annotations(config, xrd, version, detection);
        let passthrough = [
            "backstage.io/icon".to_string(),
            config.annotation("docs-url"),
            "backstage.io/source-location".to_string(),
            "backstage.io/techdocs-ref".to_string(),
        ];
        for key in passthrough {
            if let Some(val) = xrd.annotation(&key) {
                annotations.insert(key, val.to_string());
            }
        }

        EntityMetadata {
            name: template_name(config, xrd, version, detection),
            title,
            description,
            tags: entity_tags(config, xrd, version, detection),
            annotations,
            links: self.links(xrd),
        }
    }

    /// Links built from the definition's documentation, source & support annotations.
    fn links(&self, xrd: &ResourceDefinition) -> Vec<Link> {
        [("docs-url", "Documentation", "docs"), ("source-url", "Source", "github"), ("support-url", "Support", "help")]
            .iter()
            .filter_map(|(suffix, title, icon)| {
                xrd.annotation(&self.config.annotation(suffix)).map(|url| Link {
                    url: url.to_string(),
                    title: title.to_string(),
                    icon: Some(icon.to_string()),
                })
            })
            .collect()
    }

    fn output(&self, xrd: &ResourceDefinition, detection: &Detection, steps: &[ProvisioningStep]) -> TemplateOutput {
        let output = &self.config.output;
        let has_step = |id: &str| steps.iter().any(|step| step.id == id);
        let kind = detection.resolved_kind(xrd);
        let mut links = vec![];

        if output.show_resource_link {
            let path = format!("{}/{}/", output.resource_viewer_path.trim_end_matches('/'), kind.to_lowercase());
            links.push(OutputLink {
                title: format!("Open {}", kind),
                icon: Some("kind:resource".into()),
                url: Some(crate::text![path, Reference::param(params::PARAM_NAME)]),
                entity_ref: None,
            });
        }
        if output.show_pull_request_link && has_step(steps::STEP_PUBLISH) {
            links.push(OutputLink {
                title: "Pull Request".into(),
                icon: Some("github".into()),
                url: Some(Expr::Ref(Reference::step(steps::STEP_PUBLISH, "remoteUrl"))),
                entity_ref: None,
            });
        }
        if output.show_catalog_link && has_step(steps::STEP_REGISTER) {
            links.push(OutputLink {
                title: "Open in catalog".into(),
                icon: Some("catalog".into()),
                url: None,
                entity_ref: Some(Expr::Ref(Reference::step(steps::STEP_REGISTER, "entityRef"))),
            });
        }

        TemplateOutput {
            links,
            text: vec![OutputText {
                title: "Summary".into(),
                content: self.summary(xrd, detection, has_step(steps::STEP_PUBLISH)),
            }],
        }
    }

    /// The multi-line summary shown once the template has run.
    fn summary(&self, xrd: &ResourceDefinition, detection: &Detection, publishes: bool) -> Expr {
        let kind = detection.resolved_kind(xrd);
        let mut lines: Vec<Vec<Segment>> = vec![vec![
            format!("**{}** `", kind).into(),
            Reference::param(params::PARAM_NAME).into(),
            "` has been requested.".into(),
        ]];
        if detection.requires_namespace() {
            lines.push(vec!["Namespace: ".into(), Reference::param(params::PARAM_NAMESPACE).into()]);
        }
        lines.push(vec!["Owner: ".into(), Reference::param(params::PARAM_OWNER).into()]);
        if xrd.clusters.len() > 1 {
            lines.push(vec!["Cluster: ".into(), Reference::param(params::PARAM_CLUSTER).into()]);
        }
        if publishes {
            lines.push(vec![
                "GitOps: when pushed, the manifest is published to ".into(),
                Reference::param(params::PARAM_REPO_URL).into(),
                " on branch ".into(),
                Reference::param(params::PARAM_BRANCH).into(),
                ".".into(),
            ]);
            let mode: Vec<Segment> = match self.config.git_target().and_then(|git| git.create_pr) {
                Some(true) => vec!["Changes are proposed through a pull request.".into()],
                Some(false) => vec!["Changes are committed directly to the target branch.".into()],
                None => vec!["Pull request requested: ".into(), Reference::param(params::PARAM_CREATE_PR).into()],
            };
            lines.push(mode);
        }

        let segments = lines.into_iter().enumerate().fold(vec![], |mut acc, (idx, line)| {
            if idx > 0 {
                acc.push(Segment::from("\n"));
            }
            acc.extend(line);
            acc
        });
        Expr::Text(segments)
    }
}
