use std::fmt;

use thiserror::Error;

use crate::parse::{ParseError, TokenError};
use crate::{ConfigError, EvalError, RegistryError};

/// Unified error type covering every stage from registry construction to
/// evaluation.
///
/// Returned by convenience entry points like [`evaluate()`](crate::evaluate)
/// and [`Engine::compile()`](crate::Engine::compile).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The stage an [`Error`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Token,
    Parse,
    Eval,
    Registry,
    Config,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Token => "token",
            Stage::Parse => "parse",
            Stage::Eval => "eval",
            Stage::Registry => "registry",
            Stage::Config => "config",
        };
        f.write_str(name)
    }
}

impl Error {
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Error::Token(_) => Stage::Token,
            Error::Parse(_) => Stage::Parse,
            Error::Eval(_) => Stage::Eval,
            Error::Registry(_) => Stage::Registry,
            Error::Config(_) => Stage::Config,
        }
    }
}
