//! Provisioning step generation.
//!
//! Two generators share one contract: the claim generator, used for definitions whose resources
//! are requested through claims, and the direct generator, used for composites requested
//! directly. Both emit the same pipeline shape:
//!
//! ```text
//! [fetch-base] -> create-resource -> [write-manifest -> publish -> [reconcile] -> [sync] -> [register]]
//! ```
//!
//! They differ only in how the created resource selects its composition.

mod claim;
mod direct;
mod manifest;
mod publish;

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::config::Config;
use crate::detect::{Detection, Variant};
use crate::error::TransformError;
use crate::expr::{Condition, Expr, Reference};
use crate::params::{self, ParameterSection};
use crate::xrd::{ResourceDefinition, Version};

pub use claim::ClaimStepGenerator;
pub use direct::DirectStepGenerator;

pub const STEP_FETCH: &str = "fetch-base";
pub const STEP_CREATE: &str = "create-resource";
pub const STEP_WRITE: &str = "write-manifest";
pub const STEP_PUBLISH: &str = "publish";
pub const STEP_RECONCILE: &str = "reconcile";
pub const STEP_SYNC: &str = "sync";
pub const STEP_REGISTER: &str = "register";

pub const ACTION_FETCH: &str = "fetch:plain";
pub const ACTION_APPLY: &str = "kube:apply";
pub const ACTION_WRITE: &str = "roadiehq:utils:fs:write";
pub const ACTION_REGISTER: &str = "catalog:register";

/// One unit of work of a template's pipeline.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ProvisioningStep {
    pub id: String,
    pub name: String,
    pub action: String,
    /// Run this step only when the condition holds.
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    pub input: BTreeMap<String, Expr>,
}

impl ProvisioningStep {
    /// Create a new unconditional step.
    pub fn new(id: &str, name: impl Into<String>, action: impl Into<String>, input: BTreeMap<String, Expr>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            action: action.into(),
            condition: None,
            input,
        }
    }

    /// Run this step only when the given condition holds.
    pub fn when(mut self, condition: Option<Condition>) -> Self {
        self.condition = condition;
        self
    }
}

/// A generator of provisioning steps for one family of definitions.
pub trait StepGenerator: Send + Sync {
    /// A short name of this generator, used in logs.
    fn name(&self) -> &'static str;

    /// The configuration of this generator.
    fn config(&self) -> &Config;

    /// Whether this generator handles definitions of the given detection.
    fn is_compatible(&self, detection: &Detection) -> bool;

    /// The `spec` fields through which the created resource selects its composition.
    fn composition_fields(&self, xrd: &ResourceDefinition) -> BTreeMap<String, Expr>;

    /// Check this generator's configuration, returning every problem found.
    fn validate_config(&self) -> Vec<String> {
        validate_config(self.config())
    }

    /// Generate the ordered steps of the given version's template.
    fn generate(
        &self, xrd: &ResourceDefinition, version: &Version, detection: &Detection, sections: &[ParameterSection],
    ) -> Result<Vec<ProvisioningStep>> {
        if !self.is_compatible(detection) {
            bail!(TransformError::Unsupported(format!(
                "{} step generator does not handle {:?} definitions",
                self.name(),
                detection.variant()
            )));
        }
        let config = self.config();
        let mut steps = vec![];

        if config.include_fetch_action {
            steps.push(fetch_step(config));
        }

        let manifest = manifest::build(config, xrd, version, detection, sections, self.composition_fields(xrd));
        let publishing = config.publish_phase().is_some();
        let create = creation_step(xrd, detection, manifest.clone()).when(publishing.then(|| Condition::Unless(Reference::param(params::PARAM_PUSH))));
        steps.push(create);

        if let Some(phase) = config.publish_phase() {
            steps.extend(publish::steps(phase, xrd, detection, manifest));
            if config.include_register_action && phase.git.is_some() {
                steps.push(register_step());
            }
        }
        Ok(steps)
    }
}

/// Select the generator which handles definitions of the given detection.
pub fn select<'a>(detection: &Detection, claim: &'a ClaimStepGenerator, direct: &'a DirectStepGenerator) -> &'a dyn StepGenerator {
    match detection.variant() {
        Variant::LegacyClaim | Variant::LegacyClusterClaim => claim,
        Variant::ModernNamespaced | Variant::ModernCluster | Variant::LegacyClusterDirect => direct,
    }
}

/// Check the given configuration, returning every problem found.
pub fn validate_config(config: &Config) -> Vec<String> {
    let mut problems = vec![];
    if config.publish_enabled && config.publish_phase.is_none() {
        problems.push("publishing is enabled but no publishPhase is configured".to_string());
    }
    if let Some(phase) = config.publish_phase.as_ref() {
        if let Some(git) = phase.git.as_ref() {
            if git.repo_url.trim().is_empty() {
                problems.push("publishPhase.git.repoUrl is required".into());
            }
        }
        if let Some(reconcile) = phase.reconcile.as_ref() {
            if reconcile.name.trim().is_empty() {
                problems.push("publishPhase.reconcile.name is required".into());
            }
            if reconcile.namespace.trim().is_empty() {
                problems.push("publishPhase.reconcile.namespace is required".into());
            }
        }
        if let Some(sync) = phase.sync.as_ref() {
            if sync.application.trim().is_empty() {
                problems.push("publishPhase.sync.application is required".into());
            }
            if sync.server.trim().is_empty() {
                problems.push("publishPhase.sync.server is required".into());
            }
        }
    }
    if config.include_register_action && config.git_target().is_none() {
        problems.push("includeRegisterAction requires publishing to a git target".into());
    }
    problems
}

fn fetch_step(config: &Config) -> ProvisioningStep {
    let input = maplit::btreemap! {
        "url".to_string() => Expr::str(config.fetch_url.clone()),
    };
    ProvisioningStep::new(STEP_FETCH, "Fetch base content", ACTION_FETCH, input)
}

fn creation_step(xrd: &ResourceDefinition, detection: &Detection, manifest: BTreeMap<String, Expr>) -> ProvisioningStep {
    let mut input = maplit::btreemap! {
        "manifest".to_string() => Expr::Object(manifest),
        "namespaced".to_string() => Expr::bool(detection.requires_namespace()),
    };
    if let Some(cluster) = cluster_expr(xrd) {
        input.insert("clusterName".into(), cluster);
    }
    let name = format!("Create {}", detection.resolved_kind(xrd));
    ProvisioningStep::new(STEP_CREATE, name, ACTION_APPLY, input)
}

/// The cluster a step targets: the cluster parameter when several clusters are declared, else
/// the single known cluster.
pub(crate) fn cluster_expr(xrd: &ResourceDefinition) -> Option<Expr> {
    match xrd.clusters.as_slice() {
        [] => xrd.cluster_name.clone().map(Expr::str),
        [single] => Some(Expr::str(single.clone())),
        _ => Some(Expr::param(params::PARAM_CLUSTER)),
    }
}

fn register_step() -> ProvisioningStep {
    let input = maplit::btreemap! {
        "repoContentsUrl".to_string() => Expr::Ref(Reference::step(STEP_PUBLISH, "repoContentsUrl")),
        "catalogInfoPath".to_string() => Expr::str("/catalog-info.yaml"),
    };
    ProvisioningStep::new(STEP_REGISTER, "Register in catalog", ACTION_REGISTER, input)
        .when(Some(Condition::When(Reference::param(params::PARAM_PUSH))))
}
