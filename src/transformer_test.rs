use anyhow::Result;
use serde_json::json;

use crate::config::Config;
use crate::detect::Dialect;
use crate::error::TransformError;
use crate::fixtures;
use crate::params::{self, SECTION_CONFIGURATION, SECTION_METADATA};
use crate::steps;
use crate::transformer::*;
use crate::xrd::{ResourceDefinition, ResourceScope};

fn transformer() -> Result<XrdTransformer> {
    XrdTransformer::new(Config::default())
}

fn templates(entities: &[Entity]) -> Vec<&crate::Template> {
    entities.iter().filter_map(Entity::as_template).collect()
}

#[test]
fn new_refuses_invalid_config() {
    let config = Config {
        publish_enabled: true,
        ..Default::default()
    };

    let err = XrdTransformer::new(config).expect_err("expected an invalid config to be refused");

    let err = err.downcast::<TransformError>().expect("expected a transform error");
    assert!(matches!(err, TransformError::InvalidConfig(_)), "unexpected error {:?}", err);
}

#[test]
fn transformer_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<XrdTransformer>();
}

#[test]
fn scenario_modern_namespaced() -> Result<()> {
    let xrd = fixtures::definition(fixtures::MODERN_NAMESPACED)?;

    let entities = transformer()?.transform(&xrd);

    assert!(entities.len() == 2, "expected a template & an API entity, got {}", entities.len());
    let template = entities[0].as_template().expect("expected the template first");
    assert!(entities[1].as_api().is_some(), "expected the API entity second");

    let metadata = template.section(SECTION_METADATA).expect("expected a metadata section");
    assert!(
        metadata.properties.names() == vec![params::PARAM_NAME, params::PARAM_OWNER, params::PARAM_NAMESPACE],
        "unexpected metadata fields {:?}",
        metadata.properties.names()
    );
    let configuration = template.section(SECTION_CONFIGURATION).expect("expected a configuration section");
    let engine = configuration.properties.get("engine").expect("expected an engine field");
    assert!(engine.enum_ == Some(vec![json!("postgres"), json!("mysql")]), "unexpected engine enum {:?}", engine.enum_);
    let storage = configuration.properties.get("storage").expect("expected a storage field");
    assert!(storage.type_ == "number", "unexpected storage type {}", storage.type_);
    assert!(storage.minimum == Some(10.0) && storage.maximum == Some(1000.0), "unexpected storage bounds {:?}", storage);

    let create = template.step(steps::STEP_CREATE).expect("expected a creation step");
    let manifest = create.input.get("manifest").expect("expected a manifest").render()?;
    assert!(manifest["spec"]["crossplane"]["compositionSelector"].is_object(), "expected a composition selector, got {}", manifest);
    assert!(manifest["metadata"]["namespace"] == json!("${{ parameters.namespace }}"), "expected a namespace, got {}", manifest);
    Ok(())
}

#[test]
fn scenario_legacy_claim() -> Result<()> {
    let xrd = fixtures::definition(fixtures::LEGACY_CLAIM)?;

    let entities = transformer()?.transform(&xrd);

    let templates = templates(&entities);
    assert!(templates.len() == 1, "expected one template, got {}", templates.len());
    let template = templates[0];
    assert!(template.metadata.title == "Create FooClaim", "unexpected title {}", template.metadata.title);
    let create = template.step(steps::STEP_CREATE).expect("expected a creation step");
    assert!(create.name == "Create FooClaim", "unexpected step name {}", create.name);
    let manifest = create.input.get("manifest").expect("expected a manifest").render()?;
    assert!(manifest["kind"] == json!("FooClaim"), "unexpected kind {}", manifest["kind"]);
    assert!(manifest["spec"]["compositionRef"]["name"] == json!("foo-default"), "expected a named composition, got {}", manifest);
    assert!(
        template.section(SECTION_METADATA).map(|section| section.has(params::PARAM_NAMESPACE)) == Some(true),
        "expected a namespace field for claims"
    );

    let mut cluster_scoped = xrd.clone();
    cluster_scoped.api_version = "apiextensions.crossplane.io/v1".into();
    let preview = transformer()?.preview(&cluster_scoped);
    assert!(preview.requires_namespace, "expected legacy claims to always require a namespace");
    Ok(())
}

#[test]
fn scenario_legacy_cluster_claims() -> Result<()> {
    let xrd = fixtures::definition(fixtures::LEGACY_CLUSTER_CLAIM)?;
    let transformer = transformer()?;

    let preview = transformer.preview(&xrd);
    assert!(preview.dialect == Dialect::Modern, "unexpected dialect {}", preview.dialect);
    assert!(preview.uses_claims, "expected claims to be used");

    let entities = transformer.transform(&xrd);
    let template = entities[0].as_template().expect("expected a template");
    let create = template.step(steps::STEP_CREATE).expect("expected a creation step");
    assert!(create.name == "Create Bucket", "expected the claim kind, got {}", create.name);
    Ok(())
}

#[test]
fn scenario_nothing_served() -> Result<()> {
    let xrd = fixtures::definition(fixtures::NOTHING_SERVED)?;
    let transformer = transformer()?;

    let reasons = transformer.can_transform(&xrd);
    assert!(reasons == vec!["definition has no served versions".to_string()], "unexpected reasons {:?}", reasons);
    let entities = transformer.transform(&xrd);
    assert!(entities.is_empty(), "expected no entities, got {}", entities.len());
    Ok(())
}

#[test]
fn scenario_multi_cluster() -> Result<()> {
    let xrd = fixtures::definition(fixtures::MULTI_CLUSTER)?;

    let entities = transformer()?.transform(&xrd);

    let template = entities[0].as_template().expect("expected a template");
    let metadata = template.section(SECTION_METADATA).expect("expected a metadata section");
    let cluster = metadata.properties.get(params::PARAM_CLUSTER).expect("expected a cluster field");
    assert!(
        cluster.enum_ == Some(vec![json!("dev"), json!("staging"), json!("prod")]),
        "unexpected cluster values {:?}",
        cluster.enum_
    );
    let create = template.step(steps::STEP_CREATE).expect("expected a creation step");
    let cluster_ref = create.input.get("clusterName").expect("expected a cluster input").render()?;
    assert!(cluster_ref == json!("${{ parameters.cluster }}"), "unexpected cluster input {}", cluster_ref);
    Ok(())
}

#[test]
fn only_served_versions_yield_entities() -> Result<()> {
    let xrd = fixtures::definition(fixtures::MULTI_VERSION)?;

    let entities = transformer()?.transform(&xrd);

    let names: Vec<_> = entities.iter().map(Entity::name).collect();
    let expected = vec![
        "xcaches-v1alpha1",
        "xcaches-platform-example-org-v1alpha1",
        "xcaches-v1",
        "xcaches-platform-example-org-v1",
    ];
    assert!(names == expected, "unexpected entities, got {:?}, expected {:?}", names, expected);
    assert!(!names.iter().any(|name| name.contains("v1beta1")), "expected the unserved version to be skipped");
    Ok(())
}

#[test]
fn output_modes_select_artifacts() -> Result<()> {
    let xrd = fixtures::definition(fixtures::MULTI_VERSION)?;
    let transformer = transformer()?;

    let templates = transformer.transform_with(&xrd, OutputMode::TemplatesOnly);
    assert!(templates.len() == 2 && templates.iter().all(|e| e.as_template().is_some()), "expected only templates, got {}", templates.len());
    let apis = transformer.transform_with(&xrd, OutputMode::ApiEntitiesOnly);
    assert!(apis.len() == 2 && apis.iter().all(|e| e.as_api().is_some()), "expected only API entities, got {}", apis.len());

    assert!(transformer.templates(&xrd).len() == 2, "expected two templates");
    assert!(transformer.api_entities(&xrd).len() == 2, "expected two API entities");
    Ok(())
}

#[test]
fn transformation_is_idempotent() -> Result<()> {
    let transformer = transformer()?;
    for xrd in fixtures::transformable()? {
        let first = serde_json::to_value(transformer.transform(&xrd))?;
        let second = serde_json::to_value(transformer.transform(&xrd))?;
        assert!(first == second, "expected identical output for {}", xrd.name());
    }
    Ok(())
}

#[test]
fn returned_templates_hold_invariants() -> Result<()> {
    let transformer = XrdTransformer::new(fixtures::publishing_config()?)?;
    for xrd in fixtures::transformable()? {
        let preview = transformer.preview(&xrd);
        for entity in transformer.transform(&xrd) {
            let template = match entity.as_template() {
                Some(template) => template,
                None => continue,
            };
            assert!(!template.spec.parameters.is_empty(), "expected parameter sections in {}", template.metadata.name);
            assert!(!template.spec.steps.is_empty(), "expected steps in {}", template.metadata.name);
            assert!(crate::utils::is_valid_name(&template.metadata.name), "invalid name {}", template.metadata.name);

            let metadata = template.section(SECTION_METADATA).expect("expected a metadata section");
            assert!(
                metadata.has(params::PARAM_NAMESPACE) == (preview.uses_claims || preview.scope == ResourceScope::Namespaced),
                "unexpected namespace field presence in {}",
                template.metadata.name
            );
            assert!(
                metadata.has(params::PARAM_CLUSTER) == (xrd.clusters.len() > 1),
                "unexpected cluster field presence in {}",
                template.metadata.name
            );
        }
    }
    Ok(())
}

#[test]
fn per_version_failures_are_isolated() -> Result<()> {
    let mut xrd = fixtures::definition(fixtures::MULTI_VERSION)?;
    // A name made only of disallowed characters normalizes to nothing.
    let annotations = xrd.metadata.annotations.get_or_insert_with(Default::default);
    annotations.insert("crossplane.backstage.io/template-name".into(), "...".into());
    xrd.spec.versions[0].name = "!!!".into();

    let entities = transformer()?.transform(&xrd);

    let names: Vec<_> = entities.iter().map(Entity::name).collect();
    assert!(
        !templates(&entities).iter().any(|template| template.metadata.name.is_empty()),
        "expected invalid templates to be discarded, got {:?}",
        names
    );
    assert!(templates(&entities).len() == 1, "expected only the valid version's template, got {:?}", names);
    assert!(entities.iter().filter(|e| e.as_api().is_some()).count() == 2, "expected API entities to be unaffected, got {:?}", names);
    Ok(())
}

#[test]
fn build_template_reports_violations() -> Result<()> {
    let mut xrd = fixtures::definition(fixtures::MODERN_NAMESPACED)?;
    let annotations = xrd.metadata.annotations.get_or_insert_with(Default::default);
    annotations.insert("crossplane.backstage.io/template-name".into(), "___".into());
    let transformer = transformer()?;
    let detection = crate::VersionDetector.detect(&xrd);

    let err = transformer
        .build_template(&xrd, &xrd.spec.versions[0], &detection)
        .expect_err("expected an invalid template to be refused");

    let err = err.downcast::<TransformError>()?;
    match err {
        TransformError::InvalidTemplate { violations, .. } => {
            assert!(violations == vec!["template name must not be empty".to_string()], "unexpected violations {:?}", violations)
        }
        other => panic!("unexpected error {:?}", other),
    }
    Ok(())
}

#[test]
fn can_transform_reports_every_reason() {
    let transformer = transformer().expect("expected a transformer");
    let mut xrd = ResourceDefinition::default();

    let reasons = transformer.can_transform(&xrd);
    let expected = vec![
        "definition has no name".to_string(),
        "definition has no group".into(),
        "definition has no kind".into(),
        "definition has no versions".into(),
    ];
    assert!(reasons == expected, "unexpected reasons, got {:?}, expected {:?}", reasons, expected);

    xrd.metadata.name = Some("xthings.example.org".into());
    xrd.spec.group = "example.org".into();
    xrd.spec.names.kind = "XThing".into();
    xrd.spec.versions = vec![crate::Version {
        name: "v1".into(),
        served: true,
        ..Default::default()
    }];
    let reasons = transformer.can_transform(&xrd);
    assert!(reasons == vec!["served version `v1` has no schema".to_string()], "unexpected reasons {:?}", reasons);
    assert!(transformer.transform(&xrd).is_empty(), "expected a definition without schema to yield nothing");
}

#[test]
fn preview_summarizes_without_generating() -> Result<()> {
    let xrd = fixtures::definition(fixtures::MULTI_VERSION)?;

    let preview = transformer()?.preview(&xrd);

    assert!(preview.scope == ResourceScope::Namespaced, "unexpected scope {}", preview.scope);
    assert!(preview.requires_namespace, "expected a namespace requirement");
    assert!(!preview.multi_cluster, "expected a single cluster definition");
    assert!(preview.resolved_kind == "XCache", "unexpected kind {}", preview.resolved_kind);
    let versions: Vec<_> = preview.versions.iter().map(|v| (v.name.as_str(), v.served, v.deprecated, v.has_schema)).collect();
    let expected = vec![("v1alpha1", true, true, true), ("v1beta1", false, false, true), ("v1", true, false, true)];
    assert!(versions == expected, "unexpected version summaries, got {:?}, expected {:?}", versions, expected);
    Ok(())
}

#[test]
fn transform_all_skips_bad_definitions() -> Result<()> {
    let xrds = vec![
        fixtures::definition(fixtures::MODERN_NAMESPACED)?,
        fixtures::definition(fixtures::NOTHING_SERVED)?,
        fixtures::definition(fixtures::LEGACY_CLAIM)?,
    ];

    let entities = transformer()?.transform_all(&xrds, OutputMode::Combined);

    let names: Vec<_> = entities.iter().map(Entity::name).collect();
    let expected = vec!["xdatabases", "xdatabases-platform-example-org", "fooclaims", "xfoos-example-org"];
    assert!(names == expected, "unexpected entities, got {:?}, expected {:?}", names, expected);
    Ok(())
}
