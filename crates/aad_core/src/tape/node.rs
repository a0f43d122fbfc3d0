//! Tape node types.

use std::fmt;

use crate::operator::OperatorType;
use crate::types::RandomVariable;

/// Identifier of a node, equal to its position on the tape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NodeId(pub usize);

impl NodeId {
    /// Position of the node on the tape.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a node came to be recorded.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeOrigin {
    /// True variable created directly from data.
    Leaf,
    /// Untracked value wrapped so it can take part in an expression.
    Constant,
    /// Result of an operator applied to earlier nodes, in argument order.
    Derived {
        /// Operator that produced the value
        operator: OperatorType,
        /// Operand ids in argument order
        parents: Vec<NodeId>,
    },
}

/// One recorded value and the operation that produced it.
///
/// Nodes are written once by [`Tape::append`](super::Tape::append) and never
/// change afterwards.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    value: RandomVariable,
    is_constant: bool,
    parent_ids: Vec<NodeId>,
    operator: Option<OperatorType>,
}

impl Node {
    pub(super) fn new(id: NodeId, value: RandomVariable, origin: NodeOrigin) -> Self {
        let (is_constant, parent_ids, operator) = match origin {
            NodeOrigin::Leaf => (false, Vec::new(), None),
            NodeOrigin::Constant => (true, Vec::new(), None),
            NodeOrigin::Derived { operator, parents } => (false, parents, Some(operator)),
        };
        Self {
            id,
            value,
            is_constant,
            parent_ids,
            operator,
        }
    }

    /// Node identifier.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Forward value.
    #[inline]
    pub fn value(&self) -> &RandomVariable {
        &self.value
    }

    /// `true` for implicit constants.
    #[inline]
    pub fn is_constant(&self) -> bool {
        self.is_constant
    }

    /// `true` for true variables: no parents and not a constant.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.parent_ids.is_empty() && !self.is_constant
    }

    /// Operand ids in argument order (empty for leaves and constants).
    #[inline]
    pub fn parent_ids(&self) -> &[NodeId] {
        &self.parent_ids
    }

    /// Operator that produced the node, `None` for leaves and constants.
    #[inline]
    pub fn operator(&self) -> Option<OperatorType> {
        self.operator
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "variable id: {}", self.id)?;
        writeln!(f, "value: {}", self.value)?;
        match self.operator {
            Some(operator) => {
                let ids: Vec<String> = self.parent_ids.iter().map(|id| id.to_string()).collect();
                writeln!(f, "parent ids: [{}] type: {}", ids.join(", "), operator)?;
            }
            None => writeln!(f, "parent ids: none")?,
        }
        write!(
            f,
            "is true variable: {} is constant: {}",
            self.is_leaf(),
            self.is_constant
        )
    }
}
