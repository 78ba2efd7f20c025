use std::fmt;

use super::context::HostData;
use super::environment::Environment;
use super::error::{BindError, OpError};
use super::function::{FunctionValue, SubExprFunc};
use super::pool::Operand;
use super::registry::Registry;
use super::value::Value;

/// An operand whose evaluation was deferred, together with the environment
/// it must be evaluated in.
#[derive(Debug, Clone, PartialEq)]
pub struct Thunk {
    operand: Operand,
    env: Environment,
}

impl Thunk {
    #[must_use]
    pub fn new(operand: Operand, env: Environment) -> Self {
        Self { operand, env }
    }

    #[must_use]
    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    #[must_use]
    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub(crate) fn into_parts(self) -> (Operand, Environment) {
        (self.operand, self.env)
    }
}

/// An argument handed to an operator body.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// An evaluated operand.
    Value(Value),
    /// A skipped operand; force it with [`Continuation::Force`].
    Deferred(Thunk),
    /// A `{ ... }` body, unevaluated.
    Block(Operand),
}

impl Arg {
    /// The evaluated value.
    ///
    /// # Errors
    ///
    /// Returns [`OpError::Unevaluated`] for deferred operands and blocks.
    pub fn into_value(self) -> Result<Value, OpError> {
        match self {
            Arg::Value(v) => Ok(v),
            Arg::Deferred(t) => Err(OpError::Unevaluated(t.operand.to_string())),
            Arg::Block(op) => Err(OpError::Unevaluated(format!("{{{op}}}"))),
        }
    }
}

/// What an operator body produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(Value),
    /// The body needs a nested multi-step evaluation; its result becomes the
    /// operator's result.
    Call(Continuation),
}

impl From<Value> for Outcome {
    fn from(v: Value) -> Self {
        Outcome::Value(v)
    }
}

/// How `map`-style operators combine per-element results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EachMode {
    /// Collect each result.
    Map,
    /// Keep the element when the result is truthy.
    Filter,
    /// Splice each result, which must be a list.
    FlatMap,
}

impl fmt::Display for EachMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EachMode::Map => write!(f, "map"),
            EachMode::Filter => write!(f, "filter"),
            EachMode::FlatMap => write!(f, "flatMap"),
        }
    }
}

/// A multi-step computation requested by an operator body.
#[derive(Debug, Clone, PartialEq)]
pub enum Continuation {
    /// Evaluate a deferred operand.
    Force(Thunk),
    /// Apply `callee` to every element of `items`, left to right.
    Each {
        items: Vec<Value>,
        callee: Callee,
        mode: EachMode,
    },
    /// Enumerate the host object's keys.
    Keys,
}

/// Something that can be applied to arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Function(FunctionValue),
    SubExpr(SubExprFunc),
}

impl Callee {
    /// Arguments still needed before the callee runs.
    #[must_use]
    pub fn missing(&self) -> usize {
        match self {
            Callee::Function(f) => f.missing(),
            Callee::SubExpr(_) => 1,
        }
    }

    /// Apply to exactly the missing arguments.
    ///
    /// Sub-expressions never run inline: they come back as a
    /// [`Continuation::Force`] of their body in the caller's environment
    /// extended with the argument.
    ///
    /// # Errors
    ///
    /// Returns an arity error when `args` does not match
    /// [`missing`](Self::missing), and any error from the function body.
    pub fn apply(&self, scope: &Scope<'_>, mut args: Vec<Value>) -> Result<Outcome, OpError> {
        match self {
            Callee::Function(f) => f.apply(scope, args),
            Callee::SubExpr(sub) => {
                if args.len() != 1 {
                    return Err(BindError::ArityMismatch {
                        name: format!("'{}' =>", sub.arg_name()),
                        expected: 1,
                        got: args.len(),
                    }
                    .into());
                }
                let arg = args.remove(0);
                let env = scope.env().with(sub.arg_name(), arg);
                Ok(Outcome::Call(Continuation::Force(Thunk::new(
                    sub.body().clone(),
                    env,
                ))))
            }
        }
    }
}

impl From<Callee> for Value {
    fn from(c: Callee) -> Self {
        match c {
            Callee::Function(f) => Value::Function(f),
            Callee::SubExpr(s) => Value::SubExpr(s),
        }
    }
}

/// Everything an operator body may look at.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    object: &'a dyn HostData,
    env: &'a Environment,
    registry: &'a Registry,
}

impl<'a> Scope<'a> {
    #[must_use]
    pub fn new(object: &'a dyn HostData, env: &'a Environment, registry: &'a Registry) -> Self {
        Self {
            object,
            env,
            registry,
        }
    }

    #[must_use]
    pub fn object(&self) -> &'a dyn HostData {
        self.object
    }

    #[must_use]
    pub fn env(&self) -> &'a Environment {
        self.env
    }

    #[must_use]
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    #[must_use]
    pub fn truthy(&self, value: &Value) -> bool {
        value.is_truthy(self.object)
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("env", self.env)
            .field("registry", self.registry)
            .finish_non_exhaustive()
    }
}
