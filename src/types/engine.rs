use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::error::Error;
use crate::evaluate::Shared;
use crate::scheduler::{Scheduler, DEFAULT_BATCH};

use super::context::HostData;
use super::environment::Environment;
use super::error::{ConfigError, EvalError};
use super::evaluation_report::EvaluationReport;
use super::pool::{Operand, OperationPool};
use super::registry::Registry;
use super::token::Token;
use super::value::Value;

/// Step budgets and batching for an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Maximum evaluator steps per evaluation.
    pub step_budget: usize,
    /// Maximum parser steps per compilation.
    pub parse_budget: usize,
    /// Units run per native batch by the scheduler. At least 2.
    pub batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_budget: 100_000,
            parse_budget: 100_000,
            batch_size: DEFAULT_BATCH,
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a batch size below 2 or a zero budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size < 2 {
            return Err(ConfigError::BatchSize(self.batch_size));
        }
        if self.step_budget == 0 {
            return Err(ConfigError::ZeroBudget("step"));
        }
        if self.parse_budget == 0 {
            return Err(ConfigError::ZeroBudget("parse"));
        }
        Ok(())
    }

    fn scheduler(&self, budget: usize) -> Scheduler {
        Scheduler::new(self.batch_size, budget)
    }
}

/// Builder for an [`Engine`].
///
/// # Example
///
/// ```
/// use stepexpr::{Engine, Record, Value};
///
/// let engine = Engine::builder().step_budget(500).build().unwrap();
/// let object = Record::new().set("rec", "rec");
/// assert_eq!(engine.evaluate(&object, "'rec' && 'yes'").unwrap(), Value::from("yes"));
/// ```
#[derive(Debug, Default)]
pub struct EngineBuilder {
    registry: Option<Arc<Registry>>,
    config: EngineConfig,
}

impl EngineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom registry instead of the standard library.
    #[must_use]
    pub fn registry(mut self, registry: impl Into<Arc<Registry>>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    #[must_use]
    pub fn step_budget(mut self, budget: usize) -> Self {
        self.config.step_budget = budget;
        self
    }

    #[must_use]
    pub fn parse_budget(mut self, budget: usize) -> Self {
        self.config.parse_budget = budget;
        self
    }

    #[must_use]
    pub fn batch_size(mut self, batch: usize) -> Self {
        self.config.batch_size = batch;
        self
    }

    /// Replace all settings at once, e.g. with a deserialized config.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn build(self) -> Result<Engine, ConfigError> {
        self.config.validate()?;
        Ok(Engine {
            registry: self.registry.unwrap_or_else(crate::builtins::standard),
            config: self.config,
        })
    }
}

/// A registry plus configuration; compiles expression text.
///
/// Cheap to clone and safe to share between threads.
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<Registry>,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::standard()
    }
}

impl Engine {
    /// The standard library with default budgets.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            registry: crate::builtins::standard(),
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// # Errors
    ///
    /// Returns [`TokenError`](crate::TokenError) on unlexable input.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>, crate::TokenError> {
        crate::parse::tokenize(&self.registry, text)
    }

    /// Tokenize and parse `text` into a reusable [`Expression`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] or [`Error::Parse`].
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn compile(&self, text: &str) -> Result<Expression, Error> {
        let tokens = self.tokenize(text)?;
        let scheduler = self.config.scheduler(self.config.parse_budget);
        let (root, pool) = crate::parse::parse_with(scheduler, &self.registry, tokens)?;
        Ok(Expression {
            root,
            pool: Arc::new(pool),
            registry: Arc::clone(&self.registry),
            config: self.config,
        })
    }

    /// Compile and evaluate in one go.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage.
    pub fn evaluate(&self, object: &dyn HostData, text: &str) -> Result<Value, Error> {
        Ok(self.compile(text)?.evaluate(object)?)
    }
}

/// A compiled expression: root operand, operation pool and the registry it
/// was parsed against.
///
/// Evaluation never mutates it, so one expression can be evaluated many
/// times and from many threads.
#[derive(Debug, Clone)]
pub struct Expression {
    root: Operand,
    pool: Arc<OperationPool>,
    registry: Arc<Registry>,
    config: EngineConfig,
}

impl Expression {
    /// Evaluate against `object` with an empty environment.
    ///
    /// # Errors
    ///
    /// Returns the first [`EvalError`] raised.
    pub fn evaluate(&self, object: &dyn HostData) -> Result<Value, EvalError> {
        self.evaluate_with(object, &Environment::new())
    }

    /// Evaluate with pre-bound variables, readable through `v'name'`.
    ///
    /// # Errors
    ///
    /// Returns the first [`EvalError`] raised.
    pub fn evaluate_with(&self, object: &dyn HostData, env: &Environment) -> Result<Value, EvalError> {
        self.run(object, env.clone(), self.config.step_budget).0
    }

    /// Evaluate with an explicit step budget.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::BudgetExceeded`] once `budget` steps have run.
    pub fn evaluate_with_budget(
        &self,
        object: &dyn HostData,
        budget: usize,
    ) -> Result<Value, EvalError> {
        self.run(object, Environment::new(), budget).0
    }

    /// Evaluate and report step count, native depth and duration.
    pub fn evaluate_detailed(&self, object: &dyn HostData) -> EvaluationReport {
        let start = Instant::now();
        let (result, stats) = self.run(object, Environment::new(), self.config.step_budget);
        EvaluationReport::new(result, stats, start.elapsed())
    }

    #[must_use]
    pub fn root(&self) -> &Operand {
        &self.root
    }

    #[must_use]
    pub fn pool(&self) -> &OperationPool {
        &self.pool
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[tracing::instrument(level = "debug", skip_all, fields(nodes = self.pool.len(), budget = budget))]
    fn run(
        &self,
        object: &dyn HostData,
        env: Environment,
        budget: usize,
    ) -> (Result<Value, EvalError>, crate::RunStats) {
        let shared = Shared {
            object,
            registry: &self.registry,
            pool: &self.pool,
        };
        let (result, stats) =
            crate::evaluate::evaluate(shared, env, &self.root, self.config.scheduler(budget));
        match &result {
            Ok(_) => {
                tracing::debug!(steps = stats.steps, max_depth = stats.max_depth, "evaluated");
            }
            Err(e) => tracing::debug!(steps = stats.steps, error = %e, "evaluation failed"),
        }
        (result, stats)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "root: {}", self.root)?;
        write!(f, "{}", self.pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.batch_size, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_rejects_bad_config() {
        assert_eq!(
            Engine::builder().batch_size(1).build().unwrap_err(),
            ConfigError::BatchSize(1)
        );
        assert_eq!(
            Engine::builder().step_budget(0).build().unwrap_err(),
            ConfigError::ZeroBudget("step")
        );
        assert_eq!(
            Engine::builder().parse_budget(0).build().unwrap_err(),
            ConfigError::ZeroBudget("parse")
        );
    }

    #[test]
    fn compile_once_evaluate_many() {
        let engine = Engine::standard();
        let expr = engine.compile("'a' && *'a'").unwrap();
        let with = Record::new().set("a", "yes");
        let without = Record::new();
        assert_eq!(expr.evaluate(&with).unwrap(), Value::from("yes"));
        assert_eq!(expr.evaluate(&with).unwrap(), Value::from("yes"));
        assert_eq!(expr.evaluate(&without).unwrap(), Value::from("a"));
    }

    #[test]
    fn environment_is_visible() {
        let engine = Engine::standard();
        let expr = engine.compile("v'who' == 'Tim'").unwrap();
        let env = Environment::new().with("who", "Tim".into());
        assert_eq!(
            expr.evaluate_with(&Record::new(), &env).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn explicit_budget() {
        let expr = Engine::standard().compile("'a' ^ 'b' ^ 'c'").unwrap();
        assert_eq!(
            expr.evaluate_with_budget(&Record::new(), 2),
            Err(EvalError::BudgetExceeded { budget: 2 })
        );
        assert!(expr.evaluate_with_budget(&Record::new(), 1_000).is_ok());
    }

    #[test]
    fn parse_budget_applies() {
        let engine = Engine::builder().parse_budget(2).build().unwrap();
        let err = engine.compile("'a' ^ 'b' ^ 'c'").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn detailed_report() {
        let expr = Engine::standard().compile("!'x'").unwrap();
        let report = expr.evaluate_detailed(&Record::new());
        assert_eq!(report.result(), Ok(&Value::Bool(true)));
        assert!(report.steps() > 0);
    }

    #[test]
    fn detailed_report_keeps_steps_of_failed_run() {
        let engine = Engine::builder().step_budget(10).build().unwrap();
        let expr = engine.compile("!!!!!!!!!!!!!!!!!!!!'x'").unwrap();
        let report = expr.evaluate_detailed(&Record::new());
        assert_eq!(
            report.result(),
            Err(&EvalError::BudgetExceeded { budget: 10 })
        );
        assert_eq!(report.steps(), 10);
        assert!(report.max_depth() > 0);
    }

    #[test]
    fn display_lists_nodes() {
        let expr = Engine::standard().compile("!'x'").unwrap();
        assert_eq!(expr.to_string(), "root: #0\n#0: !('x')\n");
    }

    #[test]
    fn expression_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Expression>();
        assert_send_sync::<Engine>();
    }
}
