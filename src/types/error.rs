use thiserror::Error;

use crate::scheduler::SchedulerError;

use super::value::{join, Value};

/// Failure to bind or apply arguments to a function value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("'{name}' takes {arity} argument(s); none left to bind")]
    Saturated { name: String, arity: usize },

    #[error("'{name}' expects {expected} more argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
}

/// Failure to turn a name into a registered function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("unknown function '{name}'")]
    Unknown { name: String },

    #[error("function '{name}' has no overload taking {arity} argument(s)")]
    NoOverload { name: String, arity: usize },
}

/// Error reported by an operator or function body.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpError {
    #[error("Can't dereference given key: '{0}'")]
    MissingKey(String),

    #[error("Can't find variable: '{0}'")]
    MissingVariable(String),

    #[error("Unrecognized reduce operation: {0}")]
    UnknownReduce(Value),

    #[error("operand {0} was not evaluated; only `=>` accepts a `{{ }}` block")]
    Unevaluated(String),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("{message}. Operands: {}", join(operands))]
    Invalid {
        message: String,
        operands: Vec<Value>,
    },
}

impl OpError {
    /// An error carrying the operands that triggered it.
    #[must_use]
    pub fn invalid(message: impl Into<String>, operands: Vec<Value>) -> Self {
        OpError::Invalid {
            message: message.into(),
            operands,
        }
    }
}

/// Error reported by a parse hook while rewriting a reduction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RewriteError {
    message: String,
}

impl RewriteError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Invalid operator or function registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate registration of '{name}' with arity {arity}")]
    Duplicate { name: String, arity: usize },

    #[error("function '{name}' is registered with arities {}; a bare name must resolve to one", join_arities(arities))]
    AmbiguousName { name: String, arities: Vec<usize> },

    #[error("operator '{name}' is registered as both {first} and {second}")]
    ConflictingClass {
        name: String,
        first: String,
        second: String,
    },

    #[error("'{name}' has arity {arity}; at most {max} is supported")]
    ArityTooLarge {
        name: String,
        arity: usize,
        max: usize,
    },

    #[error("registered names must not be empty")]
    EmptyName,

    #[error("name '{name}' contains a reserved character")]
    ReservedCharacter { name: String },

    #[error("operator '{name}' has no evaluation body")]
    MissingBody { name: String },
}

fn join_arities(arities: &[usize]) -> String {
    arities
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("batch size must be at least 2, got {0}")]
    BatchSize(usize),

    #[error("{0} budget must be greater than zero")]
    ZeroBudget(&'static str),
}

/// State of the evaluator when an error was raised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalSnapshot {
    stack: Vec<String>,
    env: Vec<(String, Value)>,
}

impl EvalSnapshot {
    pub(crate) fn new(stack: Vec<String>, env: Vec<(String, Value)>) -> Self {
        Self { stack, env }
    }

    /// Rendered evaluation stack, bottom first.
    #[must_use]
    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    /// Variable bindings in scope, sorted by name.
    #[must_use]
    pub fn env(&self) -> &[(String, Value)] {
        &self.env
    }
}

/// Errors produced while evaluating a compiled expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("no operator '{name}' takes {arity} operand(s)")]
    UnknownOperator {
        name: String,
        arity: usize,
        snapshot: Box<EvalSnapshot>,
    },

    #[error("{source}")]
    Operator {
        name: String,
        source: OpError,
        snapshot: Box<EvalSnapshot>,
    },

    #[error("a `{{ }}` block can only be used as the right operand of `=>`")]
    BareBlock,

    #[error("step budget of {budget} exceeded")]
    BudgetExceeded { budget: usize },

    #[error("internal evaluator error: {0}")]
    Internal(String),
}

impl EvalError {
    /// Evaluator state at the failure point, when one was captured.
    #[must_use]
    pub fn snapshot(&self) -> Option<&EvalSnapshot> {
        match self {
            EvalError::UnknownOperator { snapshot, .. } | EvalError::Operator { snapshot, .. } => {
                Some(snapshot)
            }
            EvalError::BareBlock | EvalError::BudgetExceeded { .. } | EvalError::Internal(_) => {
                None
            }
        }
    }

    /// The operator-level error, if the failure came from an operator body.
    #[must_use]
    pub fn op_error(&self) -> Option<&OpError> {
        match self {
            EvalError::Operator { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<SchedulerError> for EvalError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::BudgetExceeded { budget } => EvalError::BudgetExceeded { budget },
            other => EvalError::Internal(other.to_string()),
        }
    }
}
