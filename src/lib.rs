//! Derive self-service request templates & API documentation entities from composite resource
//! definitions (XRDs).
//!
//! The entrypoint is [`XrdTransformer`], which runs the full pipeline for a definition:
//! dialect detection, parameter extraction, step generation, template assembly & validation, and
//! API entity synthesis. Everything here is a pure transformation; fetching definitions and
//! persisting the generated entities belong to the host.

pub mod api;
pub mod config;
pub mod detect;
pub mod error;
pub mod expr;
pub mod params;
pub mod steps;
pub mod template;
pub mod transformer;
pub mod utils;
pub mod xrd;

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod transformer_test;

pub use api::{ApiEntity, ApiEntityBuilder};
pub use config::Config;
pub use detect::{Detection, Dialect, Variant, VersionDetector};
pub use error::TransformError;
pub use params::{ParameterExtractor, ParameterSection};
pub use steps::{ProvisioningStep, StepGenerator};
pub use template::{Template, TemplateBuilder};
pub use transformer::{Entity, OutputMode, Preview, XrdTransformer};
pub use xrd::{ResourceDefinition, ResourceScope, SchemaNode, Version};

/// The default annotation & label key prefix used on generated entities.
pub const DEFAULT_ANNOTATION_PREFIX: &str = "crossplane.backstage.io";

/// The label used to mark generated resource manifests as managed by the self-service portal.
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
