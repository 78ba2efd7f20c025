use std::fmt;

use thiserror::Error;

use crate::scheduler::SchedulerError;
use crate::types::{render_tokens, OperationPool, Token};

/// Input the tokenizer could not consume.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("token error: Can't tokenize the remaining expression: `{remainder}`")]
pub struct TokenError {
    remainder: String,
    tokens: Vec<Token>,
}

impl TokenError {
    pub(crate) fn new(remainder: &str, tokens: Vec<Token>) -> Self {
        Self {
            remainder: remainder.to_owned(),
            tokens,
        }
    }

    /// The unconsumed input, verbatim.
    #[must_use]
    pub fn remainder(&self) -> &str {
        &self.remainder
    }

    /// Tokens produced before the failure.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

/// Parser state captured when a [`ParseError`] was raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseSnapshot {
    pub(crate) remaining: Vec<Token>,
    pub(crate) stack: Vec<String>,
    pub(crate) pool: OperationPool,
}

impl ParseSnapshot {
    #[must_use]
    pub fn remaining(&self) -> &[Token] {
        &self.remaining
    }

    /// Rendered shift stack, bottom first.
    #[must_use]
    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    #[must_use]
    pub fn pool(&self) -> &OperationPool {
        &self.pool
    }
}

/// Errors produced when parsing a token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    message: String,
    snapshot: Box<ParseSnapshot>,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            snapshot: Box::default(),
        }
    }

    pub(crate) fn with_snapshot(mut self, snapshot: ParseSnapshot) -> Self {
        self.snapshot = Box::new(snapshot);
        self
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn snapshot(&self) -> &ParseSnapshot {
        &self.snapshot
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error: {}", self.message)?;
        if !self.snapshot.remaining.is_empty() {
            write!(f, " (before `{}`)", render_tokens(&self.snapshot.remaining))?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl From<SchedulerError> for ParseError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::BudgetExceeded { budget } => {
                ParseError::new(format!("parse step budget of {budget} exceeded"))
            }
            other => ParseError::new(other.to_string()),
        }
    }
}
