//! Append-only node registry.
//!
//! The tape is the single source of truth for graph structure. Node `i`
//! always sits at position `i`, and a node may only reference parents recorded
//! before it, so creation order is a topological order of the graph and the
//! backward sweep never needs to sort.
//!
//! Nodes refer to their parents by [`NodeId`] rather than by reference; the
//! whole tape is dropped as one unit once a gradient has been extracted.
//!
//! # Example
//!
//! ```rust
//! use aad_core::operator::OperatorType;
//! use aad_core::tape::{NodeId, NodeOrigin, Tape};
//! use aad_core::types::RandomVariable;
//!
//! let mut tape = Tape::new();
//! let x = tape.append(RandomVariable::deterministic(3.0), NodeOrigin::Leaf).unwrap();
//! let y = tape
//!     .append(
//!         RandomVariable::deterministic(9.0),
//!         NodeOrigin::Derived { operator: OperatorType::Squared, parents: vec![x] },
//!     )
//!     .unwrap();
//!
//! assert_eq!(y, NodeId(1));
//! assert!(tape.get(x).unwrap().is_leaf());
//! assert!(tape.get(NodeId(5)).is_err());
//! ```

mod node;

pub use node::{Node, NodeId, NodeOrigin};

use std::ops::Index;

use crate::config::SessionConfig;
use crate::types::{AadError, AadResult, RandomVariable};

/// Append-only sequence of recorded nodes.
#[derive(Clone, Debug, Default)]
pub struct Tape {
    nodes: Vec<Node>,
    max_nodes: Option<usize>,
}

impl Tape {
    /// Creates an empty, unbounded tape.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty tape sized and bounded by `config`.
    pub fn with_config(config: &SessionConfig) -> Self {
        Self {
            nodes: Vec::with_capacity(config.initial_capacity()),
            max_nodes: config.max_nodes(),
        }
    }

    /// Records a node and returns its id (the previous length of the tape).
    ///
    /// # Errors
    ///
    /// - `AadError::TapeCapacityExceeded` if the configured limit is reached
    /// - `AadError::ArityMismatch` if a derived node has the wrong parent count
    /// - `AadError::InvalidParent` if a parent id is not smaller than the new id
    pub fn append(&mut self, value: RandomVariable, origin: NodeOrigin) -> AadResult<NodeId> {
        let id = NodeId(self.nodes.len());

        if let Some(limit) = self.max_nodes {
            if self.nodes.len() >= limit {
                return Err(AadError::TapeCapacityExceeded { limit });
            }
        }

        if let NodeOrigin::Derived { operator, parents } = &origin {
            if parents.len() != operator.arity() {
                return Err(AadError::ArityMismatch {
                    operator: operator.name(),
                    expected: operator.arity(),
                    got: parents.len(),
                });
            }
            if let Some(parent) = parents.iter().find(|parent| **parent >= id) {
                return Err(AadError::InvalidParent {
                    parent: parent.index(),
                    child: id.index(),
                });
            }
        }

        self.nodes.push(Node::new(id, value, origin));
        Ok(id)
    }

    /// Drops every node from `len` onwards.
    ///
    /// Only used to undo a composite operation that failed part way, before
    /// any handle to the dropped nodes has escaped.
    pub(crate) fn rollback(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    /// Returns the node with the given id.
    ///
    /// # Errors
    ///
    /// Returns `AadError::OutOfRange` if `id` is not on the tape.
    pub fn get(&self, id: NodeId) -> AadResult<&Node> {
        self.nodes.get(id.index()).ok_or(AadError::OutOfRange {
            id: id.index(),
            len: self.nodes.len(),
        })
    }

    /// Number of recorded nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if nothing has been recorded yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over nodes in creation order.
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Human-readable listing of every node.
    pub fn dump(&self) -> String {
        self.nodes
            .iter()
            .map(|node| node.to_string())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Direct access by id.
///
/// # Panics
///
/// Panics if `id` is not on the tape. Use [`Tape::get`] for untrusted ids.
impl Index<NodeId> for Tape {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl<'a> IntoIterator for &'a Tape {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::OperatorType;

    fn leaf(tape: &mut Tape, value: f64) -> NodeId {
        tape.append(RandomVariable::deterministic(value), NodeOrigin::Leaf)
            .unwrap()
    }

    #[test]
    fn test_ids_follow_positions() {
        let mut tape = Tape::new();
        for expected in 0..5 {
            let id = leaf(&mut tape, expected as f64);
            assert_eq!(id, NodeId(expected));
            assert_eq!(tape.get(id).unwrap().id(), id);
        }
        assert_eq!(tape.len(), 5);
    }

    #[test]
    fn test_get_out_of_range() {
        let mut tape = Tape::new();
        leaf(&mut tape, 1.0);
        assert_eq!(
            tape.get(NodeId(3)).unwrap_err(),
            AadError::OutOfRange { id: 3, len: 1 }
        );
    }

    #[test]
    fn test_parents_must_precede_child() {
        let mut tape = Tape::new();
        let x = leaf(&mut tape, 2.0);
        let err = tape
            .append(
                RandomVariable::deterministic(4.0),
                NodeOrigin::Derived {
                    operator: OperatorType::Add,
                    parents: vec![x, NodeId(1)],
                },
            )
            .unwrap_err();
        assert_eq!(err, AadError::InvalidParent { parent: 1, child: 1 });
        assert_eq!(tape.len(), 1);
    }

    #[test]
    fn test_derived_node_arity_checked() {
        let mut tape = Tape::new();
        let x = leaf(&mut tape, 2.0);
        let err = tape
            .append(
                RandomVariable::deterministic(4.0),
                NodeOrigin::Derived {
                    operator: OperatorType::Mult,
                    parents: vec![x],
                },
            )
            .unwrap_err();
        assert!(matches!(err, AadError::ArityMismatch { expected: 2, got: 1, .. }));
    }

    #[test]
    fn test_capacity_limit() {
        let config = SessionConfig::builder()
            .initial_capacity(2)
            .max_nodes(2)
            .build()
            .unwrap();
        let mut tape = Tape::with_config(&config);
        leaf(&mut tape, 1.0);
        leaf(&mut tape, 2.0);
        let err = tape
            .append(RandomVariable::deterministic(3.0), NodeOrigin::Leaf)
            .unwrap_err();
        assert_eq!(err, AadError::TapeCapacityExceeded { limit: 2 });
    }

    #[test]
    fn test_leaf_and_constant_flags() {
        let mut tape = Tape::new();
        let x = leaf(&mut tape, 1.0);
        let c = tape
            .append(RandomVariable::deterministic(2.0), NodeOrigin::Constant)
            .unwrap();
        let y = tape
            .append(
                RandomVariable::deterministic(0.5),
                NodeOrigin::Derived {
                    operator: OperatorType::Div,
                    parents: vec![x, c],
                },
            )
            .unwrap();

        assert!(tape.get(x).unwrap().is_leaf());
        assert!(!tape.get(c).unwrap().is_leaf());
        assert!(tape.get(c).unwrap().is_constant());
        let node = tape.get(y).unwrap();
        assert!(!node.is_leaf());
        assert_eq!(node.parent_ids(), &[x, c]);
        assert_eq!(node.operator(), Some(OperatorType::Div));
    }

    #[test]
    fn test_dump_lists_every_node() {
        let mut tape = Tape::new();
        let x = leaf(&mut tape, 3.0);
        tape.append(
            RandomVariable::deterministic(9.0),
            NodeOrigin::Derived {
                operator: OperatorType::Squared,
                parents: vec![x],
            },
        )
        .unwrap();
        let dump = tape.dump();
        assert!(dump.contains("variable id: 0"));
        assert!(dump.contains("parent ids: [0] type: SQUARED"));
        assert!(dump.contains("is true variable: true"));
    }
}
