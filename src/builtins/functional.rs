use crate::types::{
    Arg, Callee, Continuation, EachMode, OpClass, OpError, Outcome, RegistryBuilder, Scope,
    SubExprFunc, Value,
};

use super::{to_callee, two};

pub(super) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .operator("=>", OpClass::Infix2, |op| op.eval(sub_expression))
        .operator("bind", OpClass::Infix2, |op| op.eval(bind))
        .operator("apply", OpClass::Infix2, |op| op.eval(apply))
        .operator(",", OpClass::Infix2, |op| op.eval(comma))
        .operator("callWith", OpClass::Infix2, |op| op.eval(call_with))
        .operator("call", OpClass::Prefix1, |op| op.eval(call))
        .operator("map", OpClass::Infix2, |op| op.eval(map))
        .operator("filter", OpClass::Infix2, |op| op.eval(filter))
        .operator("flatMap", OpClass::Infix2, |op| op.eval(flat_map))
        .operator("reduce", OpClass::Infix2, |op| op.eval(reduce))
}

/// `'x' => { body }`: the only operator that receives a block unevaluated.
fn sub_expression(_: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let mut it = args.into_iter();
    match (it.next(), it.next()) {
        (Some(Arg::Value(Value::Str(name))), Some(Arg::Block(body))) => {
            Ok(Value::SubExpr(SubExprFunc::new(&name, body)).into())
        }
        (lhs, rhs) => {
            let operands = [lhs, rhs]
                .into_iter()
                .flatten()
                .filter_map(|a| match a {
                    Arg::Value(v) => Some(v),
                    Arg::Deferred(_) | Arg::Block(_) => None,
                })
                .collect();
            Err(OpError::invalid(
                "RHS operand of `=>` must be an expression",
                operands,
            ))
        }
    }
}

fn bind(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let (f, arg) = two(args)?;
    match to_callee(scope, f, "bind")? {
        Callee::Function(f) => Ok(Value::Function(f.bind(arg)?).into()),
        Callee::SubExpr(s) => Err(OpError::invalid(
            "LHS operand not supported by `bind`",
            vec![Value::SubExpr(s), arg],
        )),
    }
}

/// Apply a callee that needs exactly one more argument.
fn apply(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let (f, arg) = two(args)?;
    let callee = to_callee(scope, f, "apply")?;
    if callee.missing() != 1 {
        return Err(OpError::invalid(
            "LHS operand not supported by `apply`",
            vec![callee.into(), arg],
        ));
    }
    callee.apply(scope, vec![arg])
}

/// `a, b, c` builds one flat argument list.
fn comma(_: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    match two(args)? {
        (Value::Args(mut items), rhs) => {
            items.push(rhs);
            Ok(Value::Args(items).into())
        }
        (lhs, rhs) => Ok(Value::Args(vec![lhs, rhs]).into()),
    }
}

fn spread(value: Value) -> Vec<Value> {
    match value {
        Value::Args(items) => items,
        other => vec![other],
    }
}

fn call_with(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let (f, rest) = two(args)?;
    to_callee(scope, f, "callWith")?.apply(scope, spread(rest))
}

/// `call(F, a, b)`: the first element of the list is the callee.
fn call(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let mut items = spread(super::one(args)?).into_iter();
    let Some(f) = items.next() else {
        return Err(OpError::invalid("`call` needs a function", vec![]));
    };
    to_callee(scope, f, "call")?.apply(scope, items.collect())
}

fn each(scope: &Scope<'_>, args: Vec<Arg>, mode: EachMode) -> Result<Outcome, OpError> {
    let (list, f) = two(args)?;
    let Value::List(items) = list else {
        return Err(OpError::invalid(
            format!("LHS operand of `{mode}` must be a list"),
            vec![list, f],
        ));
    };
    let callee = to_callee(scope, f, &mode.to_string())?;
    if callee.missing() != 1 {
        return Err(OpError::invalid(
            format!("`{mode}` needs a function of one argument"),
            vec![callee.into()],
        ));
    }
    Ok(Outcome::Call(Continuation::Each {
        items,
        callee,
        mode,
    }))
}

fn map(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    each(scope, args, EachMode::Map)
}

fn filter(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    each(scope, args, EachMode::Filter)
}

fn flat_map(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    each(scope, args, EachMode::FlatMap)
}

/// `list reduce 'all'` / `list reduce 'any'` over element truthiness.
fn reduce(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let (list, how) = two(args)?;
    let Value::List(items) = list else {
        return Err(OpError::invalid(
            "LHS operand of `reduce` must be a list",
            vec![list, how],
        ));
    };
    let result = match how.as_str() {
        Some("all") => items.iter().all(|v| scope.truthy(v)),
        Some("any") => items.iter().any(|v| scope.truthy(v)),
        _ => return Err(OpError::UnknownReduce(how)),
    };
    Ok(Value::Bool(result).into())
}
