mod call;
mod context;
mod engine;
mod environment;
mod error;
mod evaluation_report;
mod function;
mod pool;
mod registry;
mod token;
mod value;

pub use call::{Arg, Callee, Continuation, EachMode, Outcome, Scope, Thunk};
pub use context::{HostData, Record};
pub use engine::{Engine, EngineBuilder, EngineConfig, Expression};
pub use environment::Environment;
pub use error::{
    BindError, ConfigError, EvalError, EvalSnapshot, OpError, RegistryError, ResolveError,
    RewriteError,
};
pub use evaluation_report::EvaluationReport;
pub use function::{FunctionValue, SubExprFunc};
pub use pool::{NodeId, OpKey, Operand, OperationNode, OperationPool};
pub use registry::{
    Definition, Kind, OpBody, OpClass, OperatorBuilder, ParseHook, ParseView, Registry,
    RegistryBuilder, MAX_ARITY,
};
pub use token::{Bracket, Token};
pub use value::Value;

pub(crate) use registry::Registration;
pub(crate) use token::render as render_tokens;
