//! GitOps publish phase steps.

use std::collections::BTreeMap;

use crate::config::{GitTarget, PublishPhase, ReconcileTarget, SyncTarget};
use crate::detect::Detection;
use crate::expr::{Condition, Expr, Reference, Segment};
use crate::params;
use crate::steps::{cluster_expr, ProvisioningStep, ACTION_WRITE, STEP_PUBLISH, STEP_RECONCILE, STEP_SYNC, STEP_WRITE};
use crate::xrd::ResourceDefinition;

/// The steps of the publish phase, in order. Each runs only when the requester opts to push.
pub fn steps(phase: &PublishPhase, xrd: &ResourceDefinition, detection: &Detection, manifest: BTreeMap<String, Expr>) -> Vec<ProvisioningStep> {
    let mut steps = vec![];
    if let Some(git) = phase.git.as_ref() {
        let path = target_path(git, xrd, detection);
        steps.push(write_step(&path, manifest));
        steps.push(publish_step(git, xrd, detection, &path));
    }
    if let Some(reconcile) = phase.reconcile.as_ref() {
        steps.push(reconcile_step(reconcile, xrd));
    }
    if let Some(sync) = phase.sync.as_ref() {
        steps.push(sync_step(sync));
    }
    steps.into_iter().map(|step| step.when(Some(push_condition()))).collect()
}

fn push_condition() -> Condition {
    Condition::When(Reference::param(params::PARAM_PUSH))
}

/// The repository directory receiving the manifest.
///
/// Namespaced resources are grouped by namespace, cluster scoped resources under `cluster`.
/// An explicit target path overrides both.
fn target_path(git: &GitTarget, xrd: &ResourceDefinition, detection: &Detection) -> Expr {
    if let Some(path) = git.target_path.as_ref().filter(|path| !path.is_empty()) {
        return Expr::str(path.clone());
    }
    let base = git.base_path.trim_end_matches('/');
    let plural = detection.resolved_plural(xrd);
    if detection.requires_namespace() {
        crate::text![format!("{}/", base), Reference::param(params::PARAM_NAMESPACE), format!("/{}", plural)]
    } else {
        Expr::str(format!("{}/cluster/{}", base, plural))
    }
}

fn write_step(path: &Expr, manifest: BTreeMap<String, Expr>) -> ProvisioningStep {
    let file = match path {
        Expr::Text(segments) => {
            let mut segments = segments.clone();
            segments.extend([Segment::from("/"), Segment::from(Reference::param(params::PARAM_NAME)), Segment::from(".yaml")]);
            Expr::Text(segments)
        }
        other => crate::text![format!("{}/", literal_text(other)), Reference::param(params::PARAM_NAME), ".yaml"],
    };
    let input = maplit::btreemap! {
        "path".to_string() => file,
        "content".to_string() => Expr::Yaml(Box::new(Expr::Object(manifest))),
    };
    ProvisioningStep::new(STEP_WRITE, "Write resource manifest", ACTION_WRITE, input)
}

fn publish_step(git: &GitTarget, xrd: &ResourceDefinition, detection: &Detection, path: &Expr) -> ProvisioningStep {
    let kind = detection.resolved_kind(xrd);
    let create_pr = match git.create_pr {
        Some(create_pr) => Expr::bool(create_pr),
        None => Expr::param(params::PARAM_CREATE_PR),
    };
    let input = maplit::btreemap! {
        "repoUrl".to_string() => Expr::param(params::PARAM_REPO_URL),
        "targetBranchName".to_string() => Expr::param(params::PARAM_BRANCH),
        "branchName".to_string() => crate::text![format!("create-{}-", kind.to_lowercase()), Reference::param(params::PARAM_NAME)],
        "title".to_string() => crate::text![format!("Create {} ", kind), Reference::param(params::PARAM_NAME)],
        "description".to_string() => crate::text![
            format!("Adds the {} manifest `", kind),
            Reference::param(params::PARAM_NAME),
            "`, requested by ",
            Reference::User("ref".into()),
            "."
        ],
        "targetPath".to_string() => path.clone(),
        "createPullRequest".to_string() => create_pr,
    };
    ProvisioningStep::new(STEP_PUBLISH, "Publish manifest", git.action.clone(), input)
}

fn reconcile_step(reconcile: &ReconcileTarget, xrd: &ResourceDefinition) -> ProvisioningStep {
    let mut input = maplit::btreemap! {
        "name".to_string() => Expr::str(reconcile.name.clone()),
        "namespace".to_string() => Expr::str(reconcile.namespace.clone()),
    };
    if let Some(cluster) = cluster_expr(xrd) {
        input.insert("clusterName".into(), cluster);
    }
    ProvisioningStep::new(STEP_RECONCILE, "Trigger reconciliation", reconcile.action.clone(), input)
}

fn sync_step(sync: &SyncTarget) -> ProvisioningStep {
    let input = maplit::btreemap! {
        "appName".to_string() => Expr::str(sync.application.clone()),
        "server".to_string() => Expr::str(sync.server.clone()),
    };
    ProvisioningStep::new(STEP_SYNC, "Sync application", sync.action.clone(), input)
}

fn literal_text(expr: &Expr) -> String {
    match expr {
        Expr::Literal(serde_json::Value::String(text)) => text.trim_end_matches('/').to_string(),
        _ => String::new(),
    }
}
