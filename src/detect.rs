//! Dialect, scope & claim usage detection.

use serde::Serialize;

use crate::xrd::{ResourceDefinition, ResourceScope, MODERN_API_VERSION_PREFIX};

/// The schema convention a definition follows.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Cluster scoped composites which are always requested through claims.
    Legacy,
    /// Scoped composites which are requested directly, optionally through claims.
    Modern,
}

impl Dialect {
    /// The tag value used for this dialect on generated entities.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Legacy => "xrd-legacy",
            Self::Modern => "xrd-modern",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Legacy => "legacy",
                Self::Modern => "modern",
            }
        )
    }
}

/// Every supported combination of dialect, scope & claim usage.
///
/// Behavior which depends on the combination must match on this type exhaustively.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    /// Legacy dialect: cluster scoped composite, requested through a claim.
    LegacyClaim,
    /// Modern dialect, namespaced composite requested directly.
    ModernNamespaced,
    /// Modern dialect, cluster scoped composite requested directly.
    ModernCluster,
    /// Modern dialect in legacy-compatibility scope, requested through a claim.
    LegacyClusterClaim,
    /// Modern dialect in legacy-compatibility scope without claim names, requested directly.
    LegacyClusterDirect,
}

/// The output of dialect detection for a definition.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    /// The dialect of the definition.
    pub dialect: Dialect,
    /// The effective scope of the definition's resources.
    pub scope: ResourceScope,
    /// Whether resources are requested through claims.
    pub uses_claims: bool,
}

impl Detection {
    /// The combination of this detection as a single variant.
    pub fn variant(&self) -> Variant {
        match (self.dialect, self.scope, self.uses_claims) {
            (Dialect::Legacy, _, _) => Variant::LegacyClaim,
            (Dialect::Modern, ResourceScope::LegacyCluster, true) => Variant::LegacyClusterClaim,
            (Dialect::Modern, ResourceScope::LegacyCluster, false) => Variant::LegacyClusterDirect,
            (Dialect::Modern, ResourceScope::Namespaced, _) => Variant::ModernNamespaced,
            (Dialect::Modern, ResourceScope::Cluster, _) => Variant::ModernCluster,
        }
    }

    /// Whether generated forms need a namespace parameter.
    pub fn requires_namespace(&self) -> bool {
        self.uses_claims || self.scope == ResourceScope::Namespaced
    }

    /// The tag value used for this detection's scope on generated entities.
    pub fn scope_tag(&self) -> &'static str {
        match self.scope {
            ResourceScope::Cluster => "cluster-scoped",
            ResourceScope::Namespaced => "namespaced",
            ResourceScope::LegacyCluster => "legacy-cluster",
        }
    }

    /// The kind users interact with: the claim kind when claims are used.
    pub fn resolved_kind<'a>(&self, xrd: &'a ResourceDefinition) -> &'a str {
        match self.claim_names(xrd) {
            Some(names) if !names.kind.is_empty() => names.kind.as_str(),
            _ => xrd.spec.names.kind.as_str(),
        }
    }

    /// The plural form users interact with: the claim plural when claims are used.
    pub fn resolved_plural<'a>(&self, xrd: &'a ResourceDefinition) -> &'a str {
        match self.claim_names(xrd) {
            Some(names) if !names.plural.is_empty() => names.plural.as_str(),
            _ => xrd.spec.names.plural.as_str(),
        }
    }

    fn claim_names<'a>(&self, xrd: &'a ResourceDefinition) -> Option<&'a crate::xrd::ResourceNames> {
        if self.uses_claims {
            xrd.spec.claim_names.as_ref()
        } else {
            None
        }
    }
}

/// Classifies definitions by dialect, scope & claim usage.
#[derive(Clone, Copy, Debug, Default)]
pub struct VersionDetector;

impl VersionDetector {
    /// Detect the dialect, scope & claim usage of the given definition.
    ///
    /// ## Rules
    /// - The modern dialect is signalled by a `v2` API version, or by an explicit scope.
    /// - An explicit scope always wins. Otherwise legacy defaults to `Cluster` and modern to
    ///   `Namespaced`.
    /// - Legacy definitions always use claims.
    /// - Modern definitions in `LegacyCluster` scope use claims only when claim names are declared.
    pub fn detect(&self, xrd: &ResourceDefinition) -> Detection {
        let explicit_scope = xrd.spec.scope;
        let dialect = if xrd.api_version.starts_with(MODERN_API_VERSION_PREFIX) || explicit_scope.is_some() {
            Dialect::Modern
        } else {
            Dialect::Legacy
        };

        let (scope, uses_claims) = match (dialect, explicit_scope) {
            (Dialect::Legacy, scope) => (scope.unwrap_or(ResourceScope::Cluster), true),
            (Dialect::Modern, Some(ResourceScope::LegacyCluster)) => (ResourceScope::LegacyCluster, xrd.spec.claim_names.is_some()),
            (Dialect::Modern, Some(scope)) => (scope, false),
            (Dialect::Modern, None) => (ResourceScope::Namespaced, false),
        };
        Detection { dialect, scope, uses_claims }
    }
}
