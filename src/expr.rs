//! Symbolic template expressions.
//!
//! Generated step inputs, defaults & output text refer to form parameters, earlier step outputs,
//! and the requesting user. Those references stay structured values all the way through
//! generation, and are only rendered into the templating syntax (`${{ ... }}`) when an entity is
//! serialized.

use std::collections::BTreeMap;

use serde::ser::Error as SerError;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::utils;

/// A reference to a value resolved when a template is executed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reference {
    /// A form parameter, addressed by its path of keys, e.g. `[xrName]` or `[database, size]`.
    Parameter(Vec<String>),
    /// An output of an earlier step.
    StepOutput { step: String, output: String },
    /// A property of the requesting user, e.g. `ref`.
    User(String),
}

impl Reference {
    /// A reference to the top-level form parameter of the given name.
    pub fn param(name: impl Into<String>) -> Self {
        Self::Parameter(vec![name.into()])
    }

    /// A reference to the form parameter at the given path of keys.
    pub fn param_path<I, K>(path: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::Parameter(path.into_iter().map(Into::into).collect())
    }

    /// A reference to an output of the given step.
    pub fn step(step: impl Into<String>, output: impl Into<String>) -> Self {
        Self::StepOutput {
            step: step.into(),
            output: output.into(),
        }
    }

    /// The bare expression of this reference, without delimiters.
    pub fn expression(&self) -> String {
        match self {
            Self::Parameter(path) => path.iter().fold(String::from("parameters"), |mut acc, key| {
                if utils::is_identifier(key) {
                    acc.push('.');
                    acc.push_str(key);
                } else {
                    acc.push_str(&format!("['{}']", key.replace('\\', "\\\\").replace('\'', "\\'")));
                }
                acc
            }),
            Self::StepOutput { step, output } => format!("steps['{}'].output.{}", step, output),
            Self::User(path) => format!("user.{}", path),
        }
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${{{{ {} }}}}", self.expression())
    }
}

/// A step run condition.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Run when the referenced value is truthy.
    When(Reference),
    /// Run when the referenced value is falsy.
    Unless(Reference),
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::When(reference) => write!(f, "{}", reference),
            Self::Unless(reference) => write!(f, "${{{{ not {} }}}}", reference.expression()),
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One segment of interpolated text.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    Text(String),
    Ref(Reference),
}

/// A structured value which may embed references.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A plain value.
    Literal(Value),
    /// A value resolved at execution time.
    Ref(Reference),
    /// Text interpolating references.
    Text(Vec<Segment>),
    /// A mapping of expressions.
    Object(BTreeMap<String, Expr>),
    /// A sequence of expressions.
    List(Vec<Expr>),
    /// An expression emitted as a YAML document string.
    Yaml(Box<Expr>),
}

impl Expr {
    /// A literal string.
    pub fn str(val: impl Into<String>) -> Self {
        Self::Literal(Value::String(val.into()))
    }

    /// A literal boolean.
    pub fn bool(val: bool) -> Self {
        Self::Literal(Value::Bool(val))
    }

    /// A reference to the top-level form parameter of the given name.
    pub fn param(name: impl Into<String>) -> Self {
        Self::Ref(Reference::param(name))
    }

    /// Look up the given key, if this is an object.
    pub fn get(&self, key: &str) -> Option<&Expr> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Follow the given path of object keys.
    pub fn pointer(&self, path: &[&str]) -> Option<&Expr> {
        path.iter().try_fold(self, |expr, key| expr.get(key))
    }

    /// The reference held by this expression, if it is one.
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Ref(reference) => Some(reference),
            _ => None,
        }
    }

    /// Collect every reference embedded in this expression, in traversal order.
    pub fn references(&self) -> Vec<&Reference> {
        fn walk<'a>(expr: &'a Expr, acc: Vec<&'a Reference>) -> Vec<&'a Reference> {
            match expr {
                Expr::Literal(_) => acc,
                Expr::Ref(reference) => {
                    let mut acc = acc;
                    acc.push(reference);
                    acc
                }
                Expr::Text(segments) => segments.iter().fold(acc, |mut acc, segment| {
                    if let Segment::Ref(reference) = segment {
                        acc.push(reference);
                    }
                    acc
                }),
                Expr::Object(map) => map.values().fold(acc, |acc, expr| walk(expr, acc)),
                Expr::List(list) => list.iter().fold(acc, |acc, expr| walk(expr, acc)),
                Expr::Yaml(inner) => walk(inner, acc),
            }
        }
        walk(self, Vec::new())
    }

    /// Render this expression into a plain JSON value.
    pub fn render(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl From<Reference> for Expr {
    fn from(reference: Reference) -> Self {
        Self::Ref(reference)
    }
}

impl From<&str> for Expr {
    fn from(val: &str) -> Self {
        Self::str(val)
    }
}

impl From<String> for Expr {
    fn from(val: String) -> Self {
        Self::str(val)
    }
}

impl From<BTreeMap<String, Expr>> for Expr {
    fn from(map: BTreeMap<String, Expr>) -> Self {
        Self::Object(map)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(val) => val.serialize(serializer),
            Self::Ref(reference) => serializer.collect_str(reference),
            Self::Text(segments) => {
                let text = segments.iter().fold(String::new(), |mut acc, segment| {
                    match segment {
                        Segment::Text(text) => acc.push_str(text),
                        Segment::Ref(reference) => acc.push_str(&reference.to_string()),
                    }
                    acc
                });
                serializer.serialize_str(&text)
            }
            Self::Object(map) => map.serialize(serializer),
            Self::List(list) => list.serialize(serializer),
            Self::Yaml(inner) => {
                let yaml = serde_yaml::to_string(inner).map_err(S::Error::custom)?;
                serializer.serialize_str(yaml.trim_start_matches("---\n"))
            }
        }
    }
}

/// Build interpolated text from a mix of literal strings & references.
///
/// ```
/// use xrd_transformer::expr::Reference;
/// let text = xrd_transformer::text!["Resource ", Reference::param("xrName"), " requested"];
/// assert_eq!(serde_json::to_value(&text).unwrap(), "Resource ${{ parameters.xrName }} requested");
/// ```
#[macro_export]
macro_rules! text {
    ($($part:expr),* $(,)?) => {
        $crate::expr::Expr::Text(vec![$($crate::expr::Segment::from($part)),*])
    };
}

impl From<&str> for Segment {
    fn from(text: &str) -> Self {
        Self::Text(text.into())
    }
}

impl From<String> for Segment {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Reference> for Segment {
    fn from(reference: Reference) -> Self {
        Self::Ref(reference)
    }
}
