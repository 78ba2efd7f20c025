use crate::types::{Arg, Continuation, OpClass, OpError, Outcome, RegistryBuilder, Scope, Value};

use super::{one, two};

/// The only symbol `$` understands.
const KEYS: &str = "KEYS";

pub(super) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .operator("*", OpClass::Prefix1, |op| op.eval(deref))
        .operator("v", OpClass::Prefix1, |op| op.eval(variable))
        .operator("$", OpClass::Prefix1, |op| op.eval(symbol))
        .operator("in", OpClass::Infix2, |op| op.eval(contains))
        .function("StartsWith", 2, starts_with)
        .function("EndsWith", 2, ends_with)
        .function("Concat", 2, concat)
}

fn literal(value: Value, op: &str) -> Result<String, OpError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(OpError::invalid(
            format!("operand of `{op}` must be a literal"),
            vec![other],
        )),
    }
}

fn deref(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let key = literal(one(args)?, "*")?;
    match scope.object().get(&key) {
        Some(v) => Ok(v.into()),
        None => Err(OpError::MissingKey(key)),
    }
}

fn variable(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let name = literal(one(args)?, "v")?;
    match scope.env().get(&name) {
        Some(v) => Ok(v.clone().into()),
        None => Err(OpError::MissingVariable(name)),
    }
}

fn symbol(_: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    match one(args)? {
        Value::Str(s) if s == KEYS => Ok(Outcome::Call(Continuation::Keys)),
        other => Err(OpError::invalid("Unrecognized symbol for `$`", vec![other])),
    }
}

fn contains(_: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    match two(args)? {
        (needle, Value::List(items)) => Ok(Value::Bool(items.contains(&needle)).into()),
        (needle, other) => Err(OpError::invalid(
            "RHS operand of `in` must be a list",
            vec![needle, other],
        )),
    }
}

fn two_literals(args: Vec<Arg>, name: &str) -> Result<(String, String), OpError> {
    match two(args)? {
        (Value::Str(a), Value::Str(b)) => Ok((a, b)),
        (a, b) => Err(OpError::invalid(
            format!("`{name}` expects two literals"),
            vec![a, b],
        )),
    }
}

fn starts_with(_: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let (prefix, s) = two_literals(args, "StartsWith")?;
    Ok(Value::Bool(s.starts_with(&prefix)).into())
}

fn ends_with(_: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let (suffix, s) = two_literals(args, "EndsWith")?;
    Ok(Value::Bool(s.ends_with(&suffix)).into())
}

/// Literals are joined; lists are appended.
fn concat(_: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    match two(args)? {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b).into()),
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a).into())
        }
        (a, b) => Err(OpError::invalid(
            "`Concat` expects two literals or two lists",
            vec![a, b],
        )),
    }
}
