use std::fmt;

use super::registry::OpClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
}

impl Bracket {
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Bracket::OpenParen => '(',
            Bracket::CloseParen => ')',
            Bracket::OpenBrace => '{',
            Bracket::CloseBrace => '}',
        }
    }
}

/// A lexical unit produced by [`tokenize`](crate::tokenize).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// The contents of a `'...'` literal, quotes stripped.
    Operand(String),
    /// A registered operator name together with its syntactic class.
    Operator { name: String, class: OpClass },
    Bracket(Bracket),
}

impl Token {
    pub(crate) fn operator(name: &str, class: OpClass) -> Self {
        Token::Operator {
            name: name.to_owned(),
            class,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Operand(s) => write!(f, "'{s}'"),
            Token::Operator { name, .. } => write!(f, "{name}"),
            Token::Bracket(b) => write!(f, "{}", b.as_char()),
        }
    }
}

pub(crate) fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
