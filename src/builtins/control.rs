use crate::types::{
    Arg, OpClass, OpError, Operand, OperationNode, Outcome, ParseView, RegistryBuilder,
    RewriteError, Scope,
};

use super::{force, values};

pub(super) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .operator("if", OpClass::Prefix3, |op| op.eval(branch).parse(if_then_else))
        .operator("then", OpClass::Prefix1, |op| op.eval(stray_then))
        .operator("else", OpClass::Prefix1, |op| op.eval(stray_else))
        .operator("?", OpClass::Infix2, |op| op.eval(missing_colon))
        .operator(":", OpClass::Infix2, |op| op.eval(missing_question).parse(ternary))
        .operator("?:", OpClass::Prefix3, |op| op.eval(branch).parse(lazy_branches))
        .operator("?:NS", OpClass::Prefix3, |op| op.eval(branch))
}

/// `if`-style selection. Deferred branches are forced; evaluated ones are
/// returned as they are, which is how `?:NS` behaves.
fn branch(scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    let mut it = args.into_iter();
    let (Some(cond), Some(then), Some(otherwise), None) = (it.next(), it.next(), it.next(), it.next())
    else {
        return Err(OpError::invalid("expected a condition and two branches", vec![]));
    };
    if scope.truthy(&cond.into_value()?) {
        force(then)
    } else {
        force(otherwise)
    }
}

fn stray_then(_: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    Err(OpError::invalid("`then` is only valid inside an `if` expression", values(args)?))
}

fn stray_else(_: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    Err(OpError::invalid("`else` is only valid inside an `if` expression", values(args)?))
}

fn missing_colon(_: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    Err(OpError::invalid("`:` branch expected", values(args)?))
}

fn missing_question(_: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
    Err(OpError::invalid("`?` branch expected", values(args)?))
}

// -- Parse hooks --------------------------------------------------------------

fn lazy_if(cond: Operand, then: Operand, otherwise: Operand) -> OperationNode {
    OperationNode::new("if", vec![cond, then.skip(), otherwise.skip()])
}

/// The single operand of a marker node such as `then x`.
fn marker_operand(view: &ParseView<'_>, operand: &Operand, marker: &str) -> Option<Operand> {
    let node = view.node_of(operand)?;
    match node.operands() {
        [inner] if node.op().name() == marker => Some(inner.clone()),
        _ => None,
    }
}

fn if_then_else(view: &ParseView<'_>, operands: Vec<Operand>) -> Result<OperationNode, RewriteError> {
    let [cond, then, otherwise] = <[Operand; 3]>::try_from(operands)
        .map_err(|_| RewriteError::new("`if` takes a condition and two branches"))?;
    let then = marker_operand(view, &then, "then")
        .ok_or_else(|| RewriteError::new("`then` branch expected in `if` expression"))?;
    let otherwise = marker_operand(view, &otherwise, "else")
        .ok_or_else(|| RewriteError::new("`else` branch expected in `if` expression"))?;
    Ok(lazy_if(cond, then, otherwise))
}

/// `c ? x : y`. Left associativity reduces `c ? x` first, so `:` finds it as
/// its left operand.
fn ternary(view: &ParseView<'_>, operands: Vec<Operand>) -> Result<OperationNode, RewriteError> {
    let expected = || RewriteError::new("`?` branch expected");
    let [lhs, otherwise] = <[Operand; 2]>::try_from(operands).map_err(|_| expected())?;
    let node = view.node_of(&lhs).ok_or_else(expected)?;
    match node.operands() {
        [cond, then] if node.op().name() == "?" => {
            Ok(lazy_if(cond.clone(), then.clone(), otherwise))
        }
        _ => Err(expected()),
    }
}

fn lazy_branches(_: &ParseView<'_>, operands: Vec<Operand>) -> Result<OperationNode, RewriteError> {
    let [cond, then, otherwise] = <[Operand; 3]>::try_from(operands)
        .map_err(|_| RewriteError::new("`?:` takes a condition and two branches"))?;
    Ok(lazy_if(cond, then, otherwise))
}
