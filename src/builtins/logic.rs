use crate::types::{
    Arg, OpClass, OpError, Operand, OperationNode, Outcome, ParseView,
    RegistryBuilder, RewriteError, Scope, Value,
};

use super::{one, two, values};

pub(super) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .operator("bool", OpClass::Prefix1, |op| op.eval(to_bool))
        .operator("!", OpClass::Prefix1, |op| op.eval(not))
        .operator("^", OpClass::Infix2, |op| op.eval(xor))
        .operator("==", OpClass::Infix2, |op| op.eval(equals))
        .operator("&&", OpClass::Infix2, |op| op.eval(and).parse(defer_rhs))
        .operator("||", OpClass::Infix2, |op| op.eval(or).parse(defer_rhs))
        .operator("and", OpClass::Infix2, |op| op.eval(and).parse(spell_and))
        .operator("or", OpClass::Infix2, |op| op.eval(or).parse(spell_or))
        .function("Not", 1, not)
}

fn to_bool(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let v = one(args)?;
    Ok(Value::Bool(scope.truthy(&v)).into())
}

fn not(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let v = one(args)?;
    Ok(Value::Bool(!scope.truthy(&v)).into())
}

fn xor(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let (a, b) = two(args)?;
    Ok(Value::Bool(scope.truthy(&a) != scope.truthy(&b)).into())
}

fn equals(_: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let (a, b) = two(args)?;
    Ok(Value::Bool(a == b).into())
}

/// Split `lhs, rhs` where only the left operand has been evaluated.
fn lhs_and_deferred(args: Vec<Arg>) -> Result<(Value, Arg), OpError> {
    let mut it = args.into_iter();
    match (it.next(), it.next(), it.next()) {
        (Some(lhs), Some(rhs), None) => Ok((lhs.into_value()?, rhs)),
        _ => Err(OpError::invalid("expected exactly two operands", values(it.collect())?)),
    }
}

fn and(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let (lhs, rhs) = lhs_and_deferred(args)?;
    if scope.truthy(&lhs) {
        super::force(rhs)
    } else {
        Ok(lhs.into())
    }
}

fn or(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let (lhs, rhs) = lhs_and_deferred(args)?;
    if scope.truthy(&lhs) {
        Ok(lhs.into())
    } else {
        super::force(rhs)
    }
}

// -- Parse hooks --------------------------------------------------------------

fn rewrite(name: &str, operands: Vec<Operand>) -> Result<OperationNode, RewriteError> {
    let mut it = operands.into_iter();
    match (it.next(), it.next()) {
        (Some(lhs), Some(rhs)) => Ok(OperationNode::new(name, vec![lhs, rhs.skip()])),
        _ => Err(RewriteError::new(format!("`{name}` takes two operands"))),
    }
}

fn defer_rhs(view: &ParseView<'_>, operands: Vec<Operand>) -> Result<OperationNode, RewriteError> {
    rewrite(view.op().name(), operands)
}

fn spell_and(_: &ParseView<'_>, operands: Vec<Operand>) -> Result<OperationNode, RewriteError> {
    rewrite("&&", operands)
}

fn spell_or(_: &ParseView<'_>, operands: Vec<Operand>) -> Result<OperationNode, RewriteError> {
    rewrite("||", operands)
}
