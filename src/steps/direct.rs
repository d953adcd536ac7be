//! Steps for composites requested directly, without a claim.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Config;
use crate::detect::{Detection, Variant};
use crate::expr::Expr;
use crate::steps::StepGenerator;
use crate::xrd::ResourceDefinition;

/// Generates steps creating a composite, which selects its composition by labels.
#[derive(Clone, Debug)]
pub struct DirectStepGenerator {
    config: Arc<Config>,
}

impl DirectStepGenerator {
    /// Create a new instance.
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl StepGenerator for DirectStepGenerator {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn is_compatible(&self, detection: &Detection) -> bool {
        match detection.variant() {
            Variant::ModernNamespaced | Variant::ModernCluster | Variant::LegacyClusterDirect => true,
            Variant::LegacyClaim | Variant::LegacyClusterClaim => false,
        }
    }

    /// A `crossplane.compositionSelector` matching the definition, and its default composition
    /// when one is declared.
    fn composition_fields(&self, xrd: &ResourceDefinition) -> BTreeMap<String, Expr> {
        let mut labels = maplit::btreemap! {
            self.config.annotation("xrd") => Expr::str(xrd.name()),
        };
        if let Some(name) = xrd.default_composition() {
            labels.insert(self.config.annotation("composition"), Expr::str(name));
        }
        maplit::btreemap! {
            "crossplane".to_string() => Expr::Object(maplit::btreemap! {
                "compositionSelector".to_string() => Expr::Object(maplit::btreemap! {
                    "matchLabels".to_string() => Expr::Object(labels),
                }),
            }),
        }
    }
}
