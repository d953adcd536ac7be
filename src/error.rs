//! Transformer error abstractions.

use thiserror::Error;

/// Transformation error variants.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The resource definition is structurally unable to produce any artifacts.
    #[error("invalid resource definition: {}", .0.join("; "))]
    InvalidDefinition(Vec<String>),
    /// A generated template violated one or more structural rules.
    #[error("generated template `{name}` is invalid: {}", .violations.join("; "))]
    InvalidTemplate { name: String, violations: Vec<String> },
    /// The transformer configuration is incomplete or contradictory.
    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),
    /// No step generator is able to handle the given definition.
    #[error("unsupported definition: {0}")]
    Unsupported(String),
    /// An artifact could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}
