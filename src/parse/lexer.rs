use winnow::combinator::{alt, delimited};
use winnow::error::{ErrMode, ModalResult};
use winnow::prelude::*;
use winnow::token::{literal, one_of, take_till, take_while};

use crate::types::{Bracket, Registry, Token};

use super::error::TokenError;

// -- Whitespace ---------------------------------------------------------------

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., is_space).void().parse_next(input)
}

/// Characters that may directly follow an operator name.
fn starts_with_delimiter(rest: &str) -> bool {
    rest.starts_with(|c: char| is_space(c) || matches!(c, '\'' | '(' | '{'))
}

// -- Tokens -------------------------------------------------------------------

fn bracket(input: &mut &str) -> ModalResult<Token> {
    one_of(['(', ')', '{', '}'])
        .map(|c| {
            Token::Bracket(match c {
                '(' => Bracket::OpenParen,
                ')' => Bracket::CloseParen,
                '{' => Bracket::OpenBrace,
                _ => Bracket::CloseBrace,
            })
        })
        .parse_next(input)
}

/// `'...'` with verbatim contents; there is no escaping.
fn quoted(input: &mut &str) -> ModalResult<Token> {
    delimited('\'', take_till(0.., '\''), '\'')
        .map(|s: &str| Token::Operand(s.to_owned()))
        .parse_next(input)
}

/// A registered operator name.
///
/// The longest name directly followed by a delimiter wins, which splits
/// `&&'b'` as `&&` rather than `&`, `&`. Failing that, a prefix operator
/// directly followed by another prefix operator is accepted so chains like
/// `!!'x'` or `!*v'x'` need no spaces.
fn operator(input: &mut &str, registry: &Registry) -> ModalResult<Token> {
    let rest: &str = *input;
    let followed_by_prefix = |after: &str| {
        registry
            .operators()
            .any(|(name, class)| class.is_prefix() && after.starts_with(name))
    };
    let found = registry
        .operators()
        .find(|(name, _)| rest.strip_prefix(name).is_some_and(starts_with_delimiter))
        .or_else(|| {
            registry.operators().find(|(name, class)| {
                class.is_prefix() && rest.strip_prefix(name).is_some_and(followed_by_prefix)
            })
        });
    match found {
        Some((name, class)) => literal(name)
            .value(Token::operator(name, class))
            .parse_next(input),
        None => Err(ErrMode::from_input(input)),
    }
}

fn token(input: &mut &str, registry: &Registry) -> ModalResult<Token> {
    alt((bracket, quoted, |i: &mut &str| operator(i, registry))).parse_next(input)
}

/// Split `text` into tokens in a single left-to-right pass.
pub(crate) fn tokenize(registry: &Registry, text: &str) -> Result<Vec<Token>, TokenError> {
    let mut input = text;
    let mut tokens = Vec::new();
    loop {
        let _ = ws.parse_next(&mut input);
        if input.is_empty() {
            return Ok(tokens);
        }
        let before = input;
        match token(&mut input, registry) {
            Ok(t) => tokens.push(t),
            Err(_) => return Err(TokenError::new(before, tokens)),
        }
    }
}
