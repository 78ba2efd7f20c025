//! The standard operator library.
//!
//! Everything here is registered through [`RegistryBuilder`] like any host
//! extension would be; the evaluator has no built-in knowledge of it.

mod control;
mod data;
mod functional;
mod logic;

use std::sync::{Arc, LazyLock};

use crate::types::{
    Arg, Callee, Continuation, OpError, Outcome, Registry, RegistryBuilder, Scope, Value,
};

/// Register every standard operator and function.
pub(crate) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    let builder = logic::install(builder);
    let builder = control::install(builder);
    let builder = data::install(builder);
    functional::install(builder)
}

static STANDARD: LazyLock<Arc<Registry>> = LazyLock::new(|| {
    Arc::new(
        Registry::builder()
            .with_standard_library()
            .build()
            .expect("standard library registrations are valid"),
    )
});

/// The shared registry holding only the standard library.
#[must_use]
pub fn standard() -> Arc<Registry> {
    Arc::clone(&STANDARD)
}

// -- Argument helpers ---------------------------------------------------------

fn values(args: Vec<Arg>) -> Result<Vec<Value>, OpError> {
    args.into_iter().map(Arg::into_value).collect()
}

fn one(args: Vec<Arg>) -> Result<Value, OpError> {
    let mut it = values(args)?.into_iter();
    match (it.next(), it.next()) {
        (Some(v), None) => Ok(v),
        _ => Err(OpError::invalid("expected exactly one operand", it.collect())),
    }
}

fn two(args: Vec<Arg>) -> Result<(Value, Value), OpError> {
    let mut it = values(args)?.into_iter();
    match (it.next(), it.next(), it.next()) {
        (Some(a), Some(b), None) => Ok((a, b)),
        _ => Err(OpError::invalid("expected exactly two operands", it.collect())),
    }
}

/// Continue with a deferred operand, or pass an evaluated one through.
fn force(arg: Arg) -> Result<Outcome, OpError> {
    match arg {
        Arg::Value(v) => Ok(Outcome::Value(v)),
        Arg::Deferred(thunk) => Ok(Outcome::Call(Continuation::Force(thunk))),
        Arg::Block(_) => arg.into_value().map(Outcome::Value),
    }
}

/// Something callable: a function value, a sub-expression, or a literal
/// naming a registered function.
fn to_callee(scope: &Scope<'_>, value: Value, op: &str) -> Result<Callee, OpError> {
    match value {
        Value::Function(f) => Ok(Callee::Function(f)),
        Value::SubExpr(s) => Ok(Callee::SubExpr(s)),
        Value::Str(name) => Ok(Callee::Function(scope.registry().resolve_name(&name)?)),
        other => Err(OpError::invalid(
            format!("LHS operand not supported by `{op}`"),
            vec![other],
        )),
    }
}
