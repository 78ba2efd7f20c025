//! A small rule/expression language evaluated against host data.
//!
//! Expressions are tokenized against a [`Registry`] of operators, parsed by
//! a shift/reduce machine into a pool of operation nodes, then evaluated by
//! an explicit stack machine. Parser and evaluator both run on the batching
//! [`scheduler`], so native recursion stays logarithmic in the number of
//! steps and every run is bounded by a step budget.
//!
//! ```
//! use stepexpr::{evaluate, Record, Value};
//!
//! let user = Record::new()
//!     .set("name1", "Tim")
//!     .set("whiteList", vec!["Tim", "John"]);
//! let ok = evaluate(
//!     &user,
//!     "$'KEYS' filter ('StartsWith' bind 'name') map ('k' => { *v'k' in *'whiteList' }) reduce 'all'",
//!     10_000,
//! )
//! .unwrap();
//! assert_eq!(ok, Value::Bool(true));
//! ```

mod builtins;
mod compile;
mod error;
mod evaluate;
pub mod parse;
pub mod scheduler;
mod types;

pub use builtins::standard as standard_registry;
pub use error::{Error, Stage};
pub use parse::{parse, tokenize, ParseError, ParseSnapshot, Parsed, TokenError};
pub use scheduler::{RunStats, Scheduler, SchedulerError};
pub use types::{
    Arg, BindError, Bracket, Callee, ConfigError, Continuation, Definition, EachMode, Engine,
    EngineBuilder, EngineConfig, Environment, EvalError, EvalSnapshot, EvaluationReport,
    Expression, FunctionValue, HostData, Kind, NodeId, OpBody, OpClass, OpError, OpKey, Operand,
    OperationNode, OperationPool, OperatorBuilder, Outcome, ParseHook, ParseView, Record,
    Registry, RegistryBuilder, RegistryError, ResolveError, RewriteError, Scope, SubExprFunc,
    Thunk, Token, Value, MAX_ARITY,
};

/// Compile and evaluate `text` with the standard library, running at most
/// `step_budget` evaluator steps.
///
/// # Errors
///
/// Returns the first [`Error`] of the token, parse or evaluation stage. A
/// budget too small for the expression, zero included, is
/// [`EvalError::BudgetExceeded`].
pub fn evaluate(object: &dyn HostData, text: &str, step_budget: usize) -> Result<Value, Error> {
    let expr = Engine::standard().compile(text)?;
    Ok(expr.evaluate_with_budget(object, step_budget)?)
}
