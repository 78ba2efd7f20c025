use std::fmt;

use super::call::{Arg, Outcome, Scope};
use super::error::{BindError, OpError};
use super::pool::{OpKey, Operand};
use super::value::{join, Value};

/// A registered function with zero or more arguments already bound.
///
/// Binding never evaluates anything; the body runs only once
/// [`apply`](Self::apply) supplies the remaining arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionValue {
    key: OpKey,
    bound: Vec<Value>,
}

impl FunctionValue {
    /// An unbound function value for a registry key.
    #[must_use]
    pub fn new(key: OpKey) -> Self {
        Self {
            key,
            bound: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.key.name()
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.key.arity()
    }

    #[must_use]
    pub fn key(&self) -> &OpKey {
        &self.key
    }

    #[must_use]
    pub fn bound(&self) -> &[Value] {
        &self.bound
    }

    /// Number of arguments still needed.
    #[must_use]
    pub fn missing(&self) -> usize {
        self.arity() - self.bound.len()
    }

    #[must_use]
    pub fn is_saturated(&self) -> bool {
        self.missing() == 0
    }

    /// Bind the next argument.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::Saturated`] if no argument is missing.
    pub fn bind(&self, arg: Value) -> Result<Self, BindError> {
        if self.is_saturated() {
            return Err(BindError::Saturated {
                name: self.name().to_owned(),
                arity: self.arity(),
            });
        }
        let mut bound = self.bound.clone();
        bound.push(arg);
        Ok(Self {
            key: self.key.clone(),
            bound,
        })
    }

    /// Supply exactly the missing arguments and run the body.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::ArityMismatch`] if `args` does not cover exactly
    /// the missing arguments, and whatever the body itself reports.
    pub fn apply(&self, scope: &Scope<'_>, args: Vec<Value>) -> Result<Outcome, OpError> {
        if args.len() != self.missing() {
            return Err(BindError::ArityMismatch {
                name: self.name().to_owned(),
                expected: self.missing(),
                got: args.len(),
            }
            .into());
        }
        let def = scope
            .registry()
            .get(&self.key)
            .ok_or_else(|| OpError::invalid("function is not registered", vec![self.clone().into()]))?;
        let all = self
            .bound
            .iter()
            .cloned()
            .chain(args)
            .map(Arg::Value)
            .collect();
        def.call(scope, all)
    }
}

impl fmt::Display for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name(), self.arity())?;
        if !self.bound.is_empty() {
            write!(f, "({})", join(&self.bound))?;
        }
        Ok(())
    }
}

/// A one-argument closure created by `'x' => { body }`.
///
/// Applying it evaluates `body` in the caller's environment extended with
/// the argument, not in the environment where `=>` ran.
#[derive(Debug, Clone, PartialEq)]
pub struct SubExprFunc {
    arg_name: String,
    body: Operand,
}

impl SubExprFunc {
    #[must_use]
    pub fn new(arg_name: &str, body: Operand) -> Self {
        Self {
            arg_name: arg_name.to_owned(),
            body,
        }
    }

    #[must_use]
    pub fn arg_name(&self) -> &str {
        &self.arg_name
    }

    #[must_use]
    pub fn body(&self) -> &Operand {
        &self.body
    }
}

impl fmt::Display for SubExprFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' => {{{}}}", self.arg_name, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starts_with() -> FunctionValue {
        FunctionValue::new(OpKey::new("StartsWith", 2))
    }

    #[test]
    fn bind_appends_without_evaluating() {
        let f = starts_with().bind("name".into()).unwrap();
        assert_eq!(f.bound(), &[Value::from("name")]);
        assert_eq!(f.missing(), 1);
        assert!(!f.is_saturated());
    }

    #[test]
    fn bind_leaves_original_untouched() {
        let f = starts_with();
        let _ = f.bind("a".into()).unwrap();
        assert!(f.bound().is_empty());
    }

    #[test]
    fn bind_saturated_fails() {
        let f = starts_with()
            .bind("a".into())
            .and_then(|f| f.bind("b".into()))
            .unwrap();
        assert!(f.is_saturated());
        let err = f.bind("c".into()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'StartsWith' takes 2 argument(s); none left to bind"
        );
    }

    #[test]
    fn structural_equality() {
        let a = starts_with().bind("x".into()).unwrap();
        let b = starts_with().bind("x".into()).unwrap();
        let c = starts_with().bind("y".into()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(starts_with(), FunctionValue::new(OpKey::new("StartsWith", 3)));
    }

    #[test]
    fn display() {
        assert_eq!(starts_with().to_string(), "StartsWith/2");
        let bound = starts_with().bind("name".into()).unwrap();
        assert_eq!(bound.to_string(), "StartsWith/2('name')");
        let sub = SubExprFunc::new("x", Operand::literal("y"));
        assert_eq!(sub.to_string(), "'x' => {'y'}");
    }
}
