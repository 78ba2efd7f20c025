use std::collections::HashMap;
use std::fmt;

use super::call::{Arg, Outcome, Scope};
use super::error::{OpError, RegistryError, ResolveError, RewriteError};
use super::function::FunctionValue;
use super::pool::{OpKey, Operand, OperationNode, OperationPool};

/// Operator or function body.
pub type OpBody = fn(&Scope<'_>, Vec<Arg>) -> Result<Outcome, OpError>;

/// Parse-time rewrite run when an operator is reduced.
///
/// Receives the reduced operands and returns the node to store instead of
/// the generic one, e.g. wrapping an operand in [`Operand::Skip`].
pub type ParseHook = fn(&ParseView<'_>, Vec<Operand>) -> Result<OperationNode, RewriteError>;

/// Largest arity a registered operator or function may have.
pub const MAX_ARITY: usize = 5;

/// Syntactic class of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpClass {
    /// `op x`
    Prefix1,
    /// `x op y`
    Infix2,
    /// `op x y z`
    Prefix3,
}

impl OpClass {
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            OpClass::Prefix1 => 1,
            OpClass::Infix2 => 2,
            OpClass::Prefix3 => 3,
        }
    }

    #[must_use]
    pub fn is_prefix(self) -> bool {
        matches!(self, OpClass::Prefix1 | OpClass::Prefix3)
    }
}

impl fmt::Display for OpClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpClass::Prefix1 => write!(f, "prefix1"),
            OpClass::Infix2 => write!(f, "infix2"),
            OpClass::Prefix3 => write!(f, "prefix3"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Usable in expression syntax.
    Operator(OpClass),
    /// Reachable only as a function value, e.g. `'StartsWith' bind 'a'`.
    Function,
}

/// A registered operator or function.
#[derive(Clone)]
pub struct Definition {
    key: OpKey,
    kind: Kind,
    eval: OpBody,
    parse: Option<ParseHook>,
}

impl Definition {
    #[must_use]
    pub fn key(&self) -> &OpKey {
        &self.key
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn parse_hook(&self) -> Option<ParseHook> {
        self.parse
    }

    /// Run the body.
    ///
    /// # Errors
    ///
    /// Whatever the body reports.
    pub fn call(&self, scope: &Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
        (self.eval)(scope, args)
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("parse_hook", &self.parse.is_some())
            .finish()
    }
}

/// Read-only view handed to parse hooks.
#[derive(Debug, Clone, Copy)]
pub struct ParseView<'a> {
    op: &'a OpKey,
    pool: &'a OperationPool,
}

impl<'a> ParseView<'a> {
    pub(crate) fn new(op: &'a OpKey, pool: &'a OperationPool) -> Self {
        Self { op, pool }
    }

    /// The operator being reduced.
    #[must_use]
    pub fn op(&self) -> &'a OpKey {
        self.op
    }

    /// The node an operand points at, if it is a node pointer.
    #[must_use]
    pub fn node_of(&self, operand: &Operand) -> Option<&'a OperationNode> {
        operand.as_node().and_then(|id| self.pool.get(id))
    }
}

/// Immutable (name, arity) keyed store of operators and functions.
#[derive(Debug, Clone)]
pub struct Registry {
    pub(crate) defs: HashMap<OpKey, Definition>,
    /// Operator names, longest first.
    pub(crate) operators: Vec<(String, OpClass)>,
    /// Function name to its single registered arity.
    pub(crate) functions: HashMap<String, usize>,
}

impl Registry {
    /// Start an empty registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    #[must_use]
    pub fn get(&self, key: &OpKey) -> Option<&Definition> {
        self.defs.get(key)
    }

    /// Exact lookup by name and arity.
    #[must_use]
    pub fn resolve(&self, name: &str, arity: usize) -> Option<&Definition> {
        self.defs.get(&OpKey::new(name, arity))
    }

    /// Turn a function name into a function value.
    ///
    /// A function name carries exactly one arity, checked when the registry
    /// is built. `name#N` additionally asserts that arity.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] for unknown names and for a `#N` suffix that
    /// does not match the registered arity.
    pub fn resolve_name(&self, name: &str) -> Result<FunctionValue, ResolveError> {
        let (base, wanted) = match name.rsplit_once('#') {
            Some((base, n)) => match n.parse::<usize>() {
                Ok(n) => (base, Some(n)),
                Err(_) => (name, None),
            },
            None => (name, None),
        };
        let arity = *self
            .functions
            .get(base)
            .ok_or_else(|| ResolveError::Unknown {
                name: name.to_owned(),
            })?;
        match wanted {
            Some(n) if n != arity => Err(ResolveError::NoOverload {
                name: base.to_owned(),
                arity: n,
            }),
            _ => Ok(FunctionValue::new(OpKey::new(base, arity))),
        }
    }

    /// Operator names with their class, longest name first.
    pub fn operators(&self) -> impl Iterator<Item = (&str, OpClass)> {
        self.operators.iter().map(|(n, c)| (n.as_str(), *c))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Registry({} operators, {} functions)",
            self.operators.len(),
            self.defs.len() - self.operators.len(),
        )
    }
}

/// A pending registration, validated by [`RegistryBuilder::build`].
#[derive(Debug, Clone)]
pub(crate) struct Registration {
    pub(crate) name: String,
    pub(crate) arity: usize,
    pub(crate) kind: Kind,
    pub(crate) eval: Option<OpBody>,
    pub(crate) parse: Option<ParseHook>,
}

impl Registration {
    pub(crate) fn into_definition(self, eval: OpBody) -> Definition {
        Definition {
            key: OpKey::new(&self.name, self.arity),
            kind: self.kind,
            eval,
            parse: self.parse,
        }
    }
}

impl fmt::Debug for OperatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorBuilder")
            .field("eval", &self.eval.is_some())
            .field("parse", &self.parse.is_some())
            .finish()
    }
}

/// Builder for a [`Registry`].
///
/// # Example
///
/// ```
/// use stepexpr::{Arg, OpClass, Outcome, Registry, Value};
///
/// let registry = Registry::builder()
///     .operator("not", OpClass::Prefix1, |op| {
///         op.eval(|scope, args| {
///             let v = args.into_iter().next().map(Arg::into_value).transpose()?;
///             Ok(Outcome::Value(Value::Bool(!v.is_some_and(|v| scope.truthy(&v)))))
///         })
///     })
///     .build()
///     .unwrap();
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct RegistryBuilder {
    pub(crate) entries: Vec<Registration>,
}

/// Intermediate builder passed to the operator definition closure.
#[derive(Clone, Default)]
pub struct OperatorBuilder {
    eval: Option<OpBody>,
    parse: Option<ParseHook>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operator. The closure must call `.eval(body)`.
    #[must_use]
    pub fn operator(
        mut self,
        name: &str,
        class: OpClass,
        f: impl FnOnce(OperatorBuilder) -> OperatorBuilder,
    ) -> Self {
        let op = f(OperatorBuilder::default());
        self.entries.push(Registration {
            name: name.to_owned(),
            arity: class.arity(),
            kind: Kind::Operator(class),
            eval: op.eval,
            parse: op.parse,
        });
        self
    }

    /// Register a plain function, reachable as a function value.
    #[must_use]
    pub fn function(mut self, name: &str, arity: usize, body: OpBody) -> Self {
        self.entries.push(Registration {
            name: name.to_owned(),
            arity,
            kind: Kind::Function,
            eval: Some(body),
            parse: None,
        });
        self
    }

    /// Add the standard operator library.
    #[must_use]
    pub fn with_standard_library(self) -> Self {
        crate::builtins::install(self)
    }

    /// Validate and freeze the registrations.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] on duplicate (name, arity) pairs, function
    /// names registered under several arities, operators registered under two
    /// classes, arities above [`MAX_ARITY`], empty or reserved names and
    /// operators without a body.
    pub fn build(self) -> Result<Registry, RegistryError> {
        crate::compile::build_registry(self.entries)
    }
}

impl OperatorBuilder {
    /// Set the evaluation body.
    #[must_use]
    pub fn eval(mut self, body: OpBody) -> Self {
        self.eval = Some(body);
        self
    }

    /// Set the parse-time rewrite.
    #[must_use]
    pub fn parse(mut self, hook: ParseHook) -> Self {
        self.parse = Some(hook);
        self
    }
}
