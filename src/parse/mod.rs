mod error;
mod lexer;
mod parser;

pub use error::{ParseError, ParseSnapshot, TokenError};
pub use parser::Parsed;

use crate::scheduler::{Scheduler, DEFAULT_BATCH};
use crate::types::{Registry, Token};

/// Split `text` into tokens using the operator names in `registry`.
///
/// # Errors
///
/// Returns [`TokenError`] with the unconsumed remainder if some input
/// matches no token rule.
pub fn tokenize(registry: &Registry, text: &str) -> Result<Vec<Token>, TokenError> {
    lexer::tokenize(registry, text)
}

/// Parse tokens into a root operand and the pool of operation nodes it
/// refers to, taking at most `budget` shift/reduce steps.
///
/// # Errors
///
/// Returns [`ParseError`] on unmatched brackets, leftover stack contents,
/// parse-hook rejections and budget exhaustion.
pub fn parse(registry: &Registry, tokens: Vec<Token>, budget: usize) -> Result<Parsed, ParseError> {
    parse_with(Scheduler::new(DEFAULT_BATCH, budget), registry, tokens)
}

#[tracing::instrument(level = "debug", skip_all, fields(tokens = tokens.len()))]
pub(crate) fn parse_with(
    scheduler: Scheduler,
    registry: &Registry,
    tokens: Vec<Token>,
) -> Result<Parsed, ParseError> {
    let parsed = parser::parse_tokens(scheduler, registry, tokens)?;
    tracing::debug!(nodes = parsed.1.len(), "parsed");
    Ok(parsed)
}
