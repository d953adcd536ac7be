//! Steps for definitions whose resources are requested through claims.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Config;
use crate::detect::{Detection, Variant};
use crate::expr::Expr;
use crate::steps::StepGenerator;
use crate::xrd::ResourceDefinition;

/// Generates steps creating a claim, which names its composition explicitly.
#[derive(Clone, Debug)]
pub struct ClaimStepGenerator {
    config: Arc<Config>,
}

impl ClaimStepGenerator {
    /// Create a new instance.
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl StepGenerator for ClaimStepGenerator {
    fn name(&self) -> &'static str {
        "claim"
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn is_compatible(&self, detection: &Detection) -> bool {
        match detection.variant() {
            Variant::LegacyClaim | Variant::LegacyClusterClaim => true,
            Variant::ModernNamespaced | Variant::ModernCluster | Variant::LegacyClusterDirect => false,
        }
    }

    /// A `compositionRef` naming the default composition, when one is declared.
    fn composition_fields(&self, xrd: &ResourceDefinition) -> BTreeMap<String, Expr> {
        xrd.default_composition()
            .map(|name| {
                maplit::btreemap! {
                    "compositionRef".to_string() => Expr::Object(maplit::btreemap! {
                        "name".to_string() => Expr::str(name),
                    }),
                }
            })
            .unwrap_or_default()
    }
}
