use std::fmt;

use super::context::HostData;
use super::function::{FunctionValue, SubExprFunc};

/// A value produced or consumed by evaluation.
///
/// Equality is structural: two functions are equal when they share name,
/// arity and bound arguments.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// A boolean produced by a logical operator.
    Bool(bool),
    /// A literal, as written between single quotes.
    Str(String),
    /// An ordered list, e.g. the result of `map` or `$'KEYS'`.
    List(Vec<Value>),
    /// A registered function, possibly with some arguments already bound.
    #[cfg_attr(feature = "serde", serde(skip))]
    Function(FunctionValue),
    /// A one-argument closure built by `=>`.
    #[cfg_attr(feature = "serde", serde(skip))]
    SubExpr(SubExprFunc),
    /// An argument list built by `,`.
    #[cfg_attr(feature = "serde", serde(skip))]
    Args(Vec<Value>),
}

impl Value {
    /// Truthiness against a host object.
    ///
    /// Booleans are themselves, the literals `'true'` and `'false'` are the
    /// matching booleans, any other literal is true iff the host has that key
    /// and lists are true iff non-empty.
    #[must_use]
    pub fn is_truthy(&self, host: &dyn HostData) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Str(s) => match s.as_str() {
                "true" => true,
                "false" => false,
                key => host.has(key),
            },
            Value::List(items) | Value::Args(items) => !items.is_empty(),
            Value::Function(_) | Value::SubExpr(_) => true,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Str(_) => "literal",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::SubExpr(_) => "sub-expression",
            Value::Args(_) => "argument list",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<FunctionValue> for Value {
    fn from(v: FunctionValue) -> Self {
        Value::Function(v)
    }
}

pub(crate) fn join(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "'{v}'"),
            Value::List(items) => write!(f, "[{}]", join(items)),
            Value::Function(func) => write!(f, "{func}"),
            Value::SubExpr(sub) => write!(f, "{sub}"),
            Value::Args(items) => write!(f, "({})", join(items)),
        }
    }
}
