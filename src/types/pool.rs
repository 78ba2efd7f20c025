use std::fmt;

/// Index of a node inside an [`OperationPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registry key: an operator or function name plus its arity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpKey {
    name: String,
    arity: usize,
}

impl OpKey {
    #[must_use]
    pub fn new(name: &str, arity: usize) -> Self {
        Self {
            name: name.to_owned(),
            arity,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Display for OpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.arity)
    }
}

/// An operand slot of an [`OperationNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A quoted literal.
    Literal(String),
    /// The result of another node in the same pool.
    Node(NodeId),
    /// A `{ ... }` body, handed to the operator unevaluated. The parser never
    /// nests a block directly inside another block.
    Block(Box<Operand>),
    /// An operand deferred by a parse hook; evaluated only if the operator
    /// asks for it.
    Skip(Box<Operand>),
}

impl Operand {
    #[must_use]
    pub fn literal(text: &str) -> Self {
        Operand::Literal(text.to_owned())
    }

    #[must_use]
    pub fn skip(self) -> Self {
        Operand::Skip(Box::new(self))
    }

    #[must_use]
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Operand::Node(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(s) => write!(f, "'{s}'"),
            Operand::Node(id) => write!(f, "{id}"),
            Operand::Block(inner) => write!(f, "{{{inner}}}"),
            Operand::Skip(inner) => write!(f, "~{inner}"),
        }
    }
}

/// One operator application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationNode {
    op: OpKey,
    operands: Vec<Operand>,
}

impl OperationNode {
    /// Build a node; the key's arity is taken from the operand count.
    #[must_use]
    pub fn new(name: &str, operands: Vec<Operand>) -> Self {
        Self {
            op: OpKey::new(name, operands.len()),
            operands,
        }
    }

    #[must_use]
    pub fn op(&self) -> &OpKey {
        &self.op
    }

    #[must_use]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub(crate) fn references(&self) -> impl Iterator<Item = NodeId> + '_ {
        fn walk(op: &Operand) -> Option<NodeId> {
            match op {
                Operand::Node(id) => Some(*id),
                Operand::Block(inner) | Operand::Skip(inner) => walk(inner),
                Operand::Literal(_) => None,
            }
        }
        self.operands.iter().filter_map(walk)
    }
}

impl fmt::Display for OperationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.op.name)?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{operand}")?;
        }
        write!(f, ")")
    }
}

/// Append-only store of operation nodes.
///
/// A node only ever points at nodes pushed before it, so the graph is
/// acyclic. Frozen after parsing and shared by every evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationPool {
    nodes: Vec<OperationNode>,
}

impl OperationPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. Returns `None` if it references a node that does not
    /// exist yet.
    pub(crate) fn push(&mut self, node: OperationNode) -> Option<NodeId> {
        let next = self.nodes.len();
        if node.references().any(|id| id.0 >= next) {
            return None;
        }
        self.nodes.push(node);
        Some(NodeId(next))
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&OperationNode> {
        self.nodes.get(id.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &OperationNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }
}

impl fmt::Display for OperationPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, node) in self.iter() {
            writeln!(f, "{id}: {node}")?;
        }
        Ok(())
    }
}
