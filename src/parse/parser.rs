use std::fmt;

use crate::scheduler::{Scheduler, Step};
use crate::types::{
    Bracket, OpClass, OpKey, Operand, OperationNode, OperationPool, ParseView, Registry, Token,
};

use super::error::{ParseError, ParseSnapshot};

/// Root operand plus the pool its nodes live in.
pub type Parsed = (Operand, OperationPool);

/// An entry of the shift stack.
#[derive(Debug, Clone, PartialEq)]
enum Item {
    Operator { name: String, class: OpClass },
    Operand(Operand),
    OpenParen,
    OpenBrace,
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Operator { name, .. } => write!(f, "{name}"),
            Item::Operand(op) => write!(f, "{op}"),
            Item::OpenParen => write!(f, "("),
            Item::OpenBrace => write!(f, "{{"),
        }
    }
}

pub(crate) struct ParseState<'r> {
    registry: &'r Registry,
    tokens: Vec<Token>,
    pos: usize,
    stack: Vec<Item>,
    pool: OperationPool,
}

impl<'r> ParseState<'r> {
    pub(crate) fn new(registry: &'r Registry, tokens: Vec<Token>) -> Self {
        Self {
            registry,
            tokens,
            pos: 0,
            stack: Vec::new(),
            pool: OperationPool::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message).with_snapshot(ParseSnapshot {
            remaining: self.tokens[self.pos.min(self.tokens.len())..].to_vec(),
            stack: self.stack.iter().map(ToString::to_string).collect(),
            pool: self.pool.clone(),
        })
    }

    /// Length of the reducible tail of the stack, if any.
    fn reducible(&self) -> Option<usize> {
        use Item::{Operand as O, Operator as Op};
        match self.stack.as_slice() {
            [.., Op { class: OpClass::Prefix1, .. }, O(_)] => Some(2),
            [.., O(_), Op { class: OpClass::Infix2, .. }, O(_)] => Some(3),
            [.., Op { class: OpClass::Prefix3, .. }, O(_), O(_), O(_)] => Some(4),
            _ => None,
        }
    }

    fn reduce(&mut self, len: usize) -> Result<(), ParseError> {
        let start = self.stack.len() - len;
        let mut name = String::new();
        let mut operands = Vec::with_capacity(len - 1);
        for item in &self.stack[start..] {
            match item {
                Item::Operator { name: n, .. } => name.clone_from(n),
                Item::Operand(op) => operands.push(op.clone()),
                Item::OpenParen | Item::OpenBrace => {
                    return Err(self.error("bracket inside a reduction"));
                }
            }
        }

        let key = OpKey::new(&name, operands.len());
        let Some(def) = self.registry.get(&key) else {
            return Err(self.error(format!("no operator '{name}' takes {} operand(s)", operands.len())));
        };
        let node = match def.parse_hook() {
            Some(hook) => hook(&ParseView::new(&key, &self.pool), operands)
                .map_err(|e| self.error(e.message()))?,
            None => OperationNode::new(&name, operands),
        };
        let Some(id) = self.pool.push(node) else {
            return Err(self.error(format!("rewrite of '{name}' referenced a node that does not exist")));
        };
        self.stack.truncate(start);
        self.stack.push(Item::Operand(Operand::Node(id)));
        Ok(())
    }

    /// Replace the `open, operand` tail by `wrap(operand)`.
    fn close(
        &mut self,
        open: &Item,
        wrap: fn(Operand) -> Operand,
        message: &str,
    ) -> Result<(), ParseError> {
        let closes = matches!(self.stack.as_slice(), [.., o, Item::Operand(_)] if o == open);
        if !closes {
            return Err(self.error(message));
        }
        let Some(Item::Operand(inner)) = self.stack.pop() else {
            return Err(self.error(message));
        };
        self.stack.pop();
        self.stack.push(Item::Operand(wrap(inner)));
        Ok(())
    }
}

/// `{ {x} }` is the same body as `{x}`; a block never wraps another block,
/// so operand nesting stays bounded however deep the braces go.
fn block(inner: Operand) -> Operand {
    match inner {
        Operand::Block(_) => inner,
        other => Operand::Block(Box::new(other)),
    }
}

/// One shift/reduce action.
pub(crate) fn parse_step(
    mut state: ParseState<'_>,
) -> Result<Step<ParseState<'_>, Parsed, ParseError>, ParseError> {
    if let Some(len) = state.reducible() {
        state.reduce(len)?;
        return Ok(Step::Continue(state));
    }

    let Some(token) = state.tokens.get(state.pos).cloned() else {
        if matches!(state.stack.as_slice(), [Item::Operand(_)]) {
            if let Some(Item::Operand(root)) = state.stack.pop() {
                return Ok(Step::Done((root, state.pool)));
            }
        }
        return Err(state.error("Malformed expression"));
    };

    match token {
        Token::Operand(text) => state.stack.push(Item::Operand(Operand::Literal(text))),
        Token::Operator { name, class } => state.stack.push(Item::Operator { name, class }),
        Token::Bracket(Bracket::OpenParen) => state.stack.push(Item::OpenParen),
        Token::Bracket(Bracket::OpenBrace) => state.stack.push(Item::OpenBrace),
        Token::Bracket(Bracket::CloseParen) => {
            state.close(&Item::OpenParen, |op| op, "Unexpected ')' parenthesis")?;
        }
        Token::Bracket(Bracket::CloseBrace) => {
            state.close(&Item::OpenBrace, block, "Unexpected '}' parenthesis")?;
        }
    }
    state.pos += 1;
    Ok(Step::Continue(state))
}

pub(crate) fn parse_tokens(
    scheduler: Scheduler,
    registry: &Registry,
    tokens: Vec<Token>,
) -> Result<Parsed, ParseError> {
    scheduler.run(parse_step, ParseState::new(registry, tokens))
}
