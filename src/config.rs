//! Transformer configuration.
//!
//! The configuration is consumed once when an [`XrdTransformer`](crate::XrdTransformer) is built
//! and is shared read-only afterwards. It may be parsed from YAML (the full structure), or from
//! the runtime environment for the scalar settings.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// The env var prefix used by [`Config::from_env`].
pub const ENV_PREFIX: &str = "XRD_";

/// Transformer configuration data.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// The prefix used for all annotation keys read from definitions & written to entities.
    #[serde(default = "Config::default_annotation_prefix")]
    pub annotation_prefix: String,
    /// The default owner entity ref offered by the owner parameter.
    #[serde(default = "Config::default_owner")]
    pub default_owner: String,
    /// The owner declared on generated templates, if any.
    #[serde(default)]
    pub template_owner: Option<String>,
    /// Tags added to every generated entity.
    #[serde(default)]
    pub additional_tags: Vec<String>,

    /// Prepend a content-fetch step to every template.
    #[serde(default)]
    pub include_fetch_action: bool,
    /// The location fetched by the content-fetch step.
    #[serde(default = "Config::default_fetch_url")]
    pub fetch_url: String,
    /// Append a catalog registration step to every template.
    #[serde(default)]
    pub include_register_action: bool,
    /// Offer GitOps publishing of the generated manifest.
    #[serde(default)]
    pub publish_enabled: bool,
    /// Rewrite `{{ name }}` placeholder defaults into parameter references.
    #[serde(default)]
    pub default_placeholders: bool,

    /// Output descriptor settings.
    #[serde(default)]
    pub output: OutputConfig,
    /// The publish phase, used only when `publish_enabled` is set.
    #[serde(default)]
    pub publish_phase: Option<PublishPhase>,
}

/// Settings controlling the links of a template's output descriptor.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    /// Link to the created resource in the resource viewer.
    #[serde(default = "default_true")]
    pub show_resource_link: bool,
    /// The path of the resource viewer, the resource name is appended.
    #[serde(default = "OutputConfig::default_resource_viewer_path")]
    pub resource_viewer_path: String,
    /// Link to the pull request opened by the publish step.
    #[serde(default = "default_true")]
    pub show_pull_request_link: bool,
    /// Link to the catalog entry created by the registration step.
    #[serde(default = "default_true")]
    pub show_catalog_link: bool,
}

/// The GitOps publish phase.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublishPhase {
    /// Source-control publishing of the manifest.
    #[serde(default)]
    pub git: Option<GitTarget>,
    /// A reconciliation trigger run after publishing.
    #[serde(default)]
    pub reconcile: Option<ReconcileTarget>,
    /// An external sync run after publishing.
    #[serde(default)]
    pub sync: Option<SyncTarget>,
}

/// Source-control target of the publish phase.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GitTarget {
    /// The action used to publish.
    #[serde(default = "GitTarget::default_action")]
    pub action: String,
    /// The repository location, e.g. `github.com?owner=org&repo=gitops`.
    #[serde(default)]
    pub repo_url: String,
    /// The target branch.
    #[serde(default = "GitTarget::default_branch")]
    pub branch: String,
    /// The root directory of generated manifests inside the repository.
    #[serde(default = "GitTarget::default_base_path")]
    pub base_path: String,
    /// An explicit target directory, overriding the scope-derived path.
    #[serde(default)]
    pub target_path: Option<String>,
    /// Force pull-request (`true`) or direct-commit (`false`) mode. When absent, the requester
    /// decides through the `createPr` parameter.
    #[serde(default)]
    pub create_pr: Option<bool>,
}

/// Reconciliation trigger target of the publish phase.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileTarget {
    /// The action used to trigger reconciliation.
    #[serde(default = "ReconcileTarget::default_action")]
    pub action: String,
    /// The name of the reconciled object.
    #[serde(default)]
    pub name: String,
    /// The namespace of the reconciled object.
    #[serde(default)]
    pub namespace: String,
}

/// External sync target of the publish phase.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncTarget {
    /// The action used to trigger the sync.
    #[serde(default = "SyncTarget::default_action")]
    pub action: String,
    /// The application to sync.
    #[serde(default)]
    pub application: String,
    /// The server instance which owns the application.
    #[serde(default)]
    pub server: String,
}

/// The scalar subset of the configuration which may be sourced from the environment.
#[derive(Debug, Deserialize)]
struct EnvConfig {
    annotation_prefix: Option<String>,
    default_owner: Option<String>,
    template_owner: Option<String>,
    #[serde(default)]
    additional_tags: Vec<String>,
    #[serde(default)]
    include_fetch_action: bool,
    fetch_url: Option<String>,
    #[serde(default)]
    include_register_action: bool,
    #[serde(default)]
    publish_enabled: bool,
    #[serde(default)]
    default_placeholders: bool,
}

impl Config {
    /// Parse a configuration from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("error parsing transformer config yaml")
    }

    /// Parse a configuration from the YAML file at the given path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).with_context(|| format!("error reading transformer config from {:?}", path))?;
        Self::from_yaml(&yaml)
    }

    /// Build a configuration from the runtime environment.
    ///
    /// Only scalar settings are read, using the `XRD_` prefix (e.g. `XRD_DEFAULT_OWNER`). The
    /// publish phase is structured and can only be supplied through YAML.
    pub fn from_env() -> Result<Self> {
        let env: EnvConfig = envy::prefixed(ENV_PREFIX).from_env().context("error building transformer config from env")?;
        Ok(Self::from(env))
    }

    /// Build a configuration from the given env var pairs, as if they were the environment.
    pub fn from_env_iter<I: IntoIterator<Item = (String, String)>>(vars: I) -> Result<Self> {
        let env: EnvConfig = envy::prefixed(ENV_PREFIX).from_iter(vars).context("error building transformer config from env")?;
        Ok(Self::from(env))
    }

    /// The configured git target, when publishing is enabled.
    pub fn git_target(&self) -> Option<&GitTarget> {
        self.publish_phase().and_then(|phase| phase.git.as_ref())
    }

    /// The configured publish phase, when publishing is enabled.
    pub fn publish_phase(&self) -> Option<&PublishPhase> {
        if !self.publish_enabled {
            return None;
        }
        self.publish_phase.as_ref()
    }

    /// Build a fully-qualified annotation key from the given suffix.
    pub fn annotation(&self, suffix: &str) -> String {
        format!("{}/{}", self.annotation_prefix, suffix)
    }

    fn default_annotation_prefix() -> String {
        crate::DEFAULT_ANNOTATION_PREFIX.into()
    }

    fn default_owner() -> String {
        "group:default/platform-team".into()
    }

    fn default_fetch_url() -> String {
        "./content".into()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            annotation_prefix: Self::default_annotation_prefix(),
            default_owner: Self::default_owner(),
            template_owner: None,
            additional_tags: vec![],
            include_fetch_action: false,
            fetch_url: Self::default_fetch_url(),
            include_register_action: false,
            publish_enabled: false,
            default_placeholders: false,
            output: OutputConfig::default(),
            publish_phase: None,
        }
    }
}

impl From<EnvConfig> for Config {
    fn from(env: EnvConfig) -> Self {
        let base = Config::default();
        Self {
            annotation_prefix: env.annotation_prefix.unwrap_or(base.annotation_prefix),
            default_owner: env.default_owner.unwrap_or(base.default_owner),
            template_owner: env.template_owner,
            additional_tags: env.additional_tags,
            include_fetch_action: env.include_fetch_action,
            fetch_url: env.fetch_url.unwrap_or(base.fetch_url),
            include_register_action: env.include_register_action,
            publish_enabled: env.publish_enabled,
            default_placeholders: env.default_placeholders,
            output: base.output,
            publish_phase: None,
        }
    }
}

impl OutputConfig {
    fn default_resource_viewer_path() -> String {
        "/crossplane-resources".into()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            show_resource_link: true,
            resource_viewer_path: Self::default_resource_viewer_path(),
            show_pull_request_link: true,
            show_catalog_link: true,
        }
    }
}

impl GitTarget {
    fn default_action() -> String {
        "publish:github:pull-request".into()
    }

    fn default_branch() -> String {
        "main".into()
    }

    fn default_base_path() -> String {
        "manifests".into()
    }
}

impl ReconcileTarget {
    fn default_action() -> String {
        "flux:reconcile".into()
    }
}

impl SyncTarget {
    fn default_action() -> String {
        "argocd:sync".into()
    }
}

fn default_true() -> bool {
    true
}
