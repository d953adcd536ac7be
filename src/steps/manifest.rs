//! The resource manifest created by a template.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::detect::Detection;
use crate::expr::{Expr, Reference};
use crate::params::{self, ParameterDescriptor, ParameterSection};
use crate::template;
use crate::xrd::{ResourceDefinition, Version};

/// The value of the managed-by label on created resources.
pub const MANAGED_BY: &str = "backstage";

/// Build the manifest of the resource a template creates.
///
/// `composition` entries are merged into the manifest's `spec` last, so they win over schema
/// fields of the same name.
pub fn build(
    config: &Config, xrd: &ResourceDefinition, version: &Version, detection: &Detection, sections: &[ParameterSection],
    composition: BTreeMap<String, Expr>,
) -> BTreeMap<String, Expr> {
    let mut metadata = maplit::btreemap! {
        "name".to_string() => Expr::param(params::PARAM_NAME),
        "labels".to_string() => Expr::Object(maplit::btreemap! {
            crate::LABEL_MANAGED_BY.to_string() => Expr::str(MANAGED_BY),
            config.annotation("xrd") => Expr::str(xrd.name()),
        }),
        "annotations".to_string() => Expr::Object(maplit::btreemap! {
            config.annotation("requested-by") => Expr::Ref(Reference::User("ref".into())),
            config.annotation("owner") => Expr::param(params::PARAM_OWNER),
            config.annotation("source-template") => Expr::str(format!("template:default/{}", template::template_name(config, xrd, version, detection))),
        }),
    };
    if detection.requires_namespace() {
        metadata.insert("namespace".into(), Expr::param(params::PARAM_NAMESPACE));
    }

    let mut spec = spec_fields(sections);
    spec.extend(composition);

    maplit::btreemap! {
        "apiVersion".to_string() => Expr::str(xrd.resource_api_version(version)),
        "kind".to_string() => Expr::str(detection.resolved_kind(xrd)),
        "metadata".to_string() => Expr::Object(metadata),
        "spec".to_string() => Expr::Object(spec),
    }
}

/// Map every configuration field onto a reference to its form parameter.
fn spec_fields(sections: &[ParameterSection]) -> BTreeMap<String, Expr> {
    params::find_section(sections, params::SECTION_CONFIGURATION)
        .map(|section| {
            section.properties.iter().fold(BTreeMap::new(), |mut acc, (key, descriptor)| {
                acc.insert(key.to_string(), field_expr(&[key], descriptor));
                acc
            })
        })
        .unwrap_or_default()
}

/// A reference to the given field, expanded into a sub-structure for objects.
fn field_expr(path: &[&str], descriptor: &ParameterDescriptor) -> Expr {
    if descriptor.properties.is_empty() {
        return Expr::Ref(Reference::param_path(path.iter().copied()));
    }
    let children = descriptor.properties.iter().fold(BTreeMap::new(), |mut acc, (key, child)| {
        let child_path: Vec<&str> = path.iter().copied().chain(std::iter::once(key)).collect();
        acc.insert(key.to_string(), field_expr(&child_path, child));
        acc
    });
    Expr::Object(children)
}
