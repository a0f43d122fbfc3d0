//! # Computation Graph Export
//!
//! Node/edge view of the ancestry of one output, for inspection and
//! visualisation of recorded expressions.
//!
//! ## D3.js Compatibility
//!
//! - `ComputationGraph.edges` is serialised as `links`
//! - `NodeGroup` variants use lowercase serialisation
//!
//! ## Example
//!
//! ```rust
//! use aad_core::graph::NodeGroup;
//! use aad_core::AadSession;
//!
//! let session = AadSession::new();
//! let x = session.create_leaf(4.0).unwrap();
//! let z = x.div(2.0).unwrap();
//!
//! let graph = session.graph(&z).unwrap();
//! assert_eq!(graph.metadata.node_count, 3);
//! assert_eq!(graph.find_node(x.id()).unwrap().group, NodeGroup::Leaf);
//! assert_eq!(graph.find_path(x.id(), z.id()), Some(vec![x.id(), z.id()]));
//! ```

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::operator::OperatorType;
use crate::tape::{NodeId, Tape};
use crate::types::AadResult;

// =============================================================================
// NodeGroup
// =============================================================================

/// Role of a node within the exported graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NodeGroup {
    /// True variable (gradient target)
    Leaf,
    /// Implicit or explicit constant
    Constant,
    /// Derived node between the leaves and the output
    Intermediate,
    /// The node the graph was exported for
    Output,
}

// =============================================================================
// GraphNode / GraphEdge
// =============================================================================

/// A node in the exported graph.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct GraphNode {
    /// Tape id
    pub id: NodeId,

    /// Operator name, or `leaf` / `constant`
    pub label: String,

    /// Operator that produced the node
    pub operator: Option<OperatorType>,

    /// Mean of the forward value over paths
    pub value: f64,

    /// Number of realizations of the forward value
    pub paths: usize,

    /// Role in the graph
    pub group: NodeGroup,
}

/// Dependency from a parent to the node it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct GraphEdge {
    /// Parent id
    pub source: NodeId,

    /// Child id
    pub target: NodeId,

    /// Argument position of the parent in the child's operator
    pub slot: usize,
}

/// Summary of an exported graph.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct GraphMetadata {
    /// Node the graph was exported for
    pub output: NodeId,

    /// Total number of nodes
    pub node_count: usize,

    /// Total number of edges
    pub edge_count: usize,

    /// Number of true variables
    pub leaf_count: usize,

    /// Longest dependency chain ending at the output
    pub depth: usize,
}

// =============================================================================
// ComputationGraph
// =============================================================================

/// Ancestry of one output, ordered by tape id.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ComputationGraph {
    /// Nodes in increasing id order
    pub nodes: Vec<GraphNode>,

    /// Parent-to-child edges (serialised as "links")
    #[cfg_attr(feature = "serde", serde(rename = "links"))]
    pub edges: Vec<GraphEdge>,

    /// Counts and depth
    pub metadata: GraphMetadata,
}

impl ComputationGraph {
    /// Exports every node `output` depends on, including `output` itself.
    ///
    /// # Errors
    ///
    /// Returns `AadError::OutOfRange` if `output` is not on the tape.
    pub fn from_tape(tape: &Tape, output: NodeId) -> AadResult<Self> {
        tape.get(output)?;

        let mut ancestry = BTreeSet::new();
        let mut stack = vec![output];
        while let Some(id) = stack.pop() {
            if ancestry.insert(id) {
                stack.extend_from_slice(tape.get(id)?.parent_ids());
            }
        }

        let mut nodes = Vec::with_capacity(ancestry.len());
        let mut edges = Vec::new();
        let mut depth: HashMap<NodeId, usize> = HashMap::with_capacity(ancestry.len());

        // Ascending ids visit every parent before its children.
        for &id in &ancestry {
            let node = tape.get(id)?;
            let group = if id == output {
                NodeGroup::Output
            } else if node.is_leaf() {
                NodeGroup::Leaf
            } else if node.is_constant() {
                NodeGroup::Constant
            } else {
                NodeGroup::Intermediate
            };
            let label = match node.operator() {
                Some(operator) => operator.name().to_string(),
                None if node.is_constant() => "constant".to_string(),
                None => "leaf".to_string(),
            };

            let node_depth = node
                .parent_ids()
                .iter()
                .map(|parent| depth.get(parent).copied().unwrap_or(0) + 1)
                .max()
                .unwrap_or(0);
            depth.insert(id, node_depth);

            edges.extend(
                node.parent_ids()
                    .iter()
                    .enumerate()
                    .map(|(slot, &source)| GraphEdge {
                        source,
                        target: id,
                        slot,
                    }),
            );

            nodes.push(GraphNode {
                id,
                label,
                operator: node.operator(),
                value: node.value().average(),
                paths: node.value().size(),
                group,
            });
        }

        let metadata = GraphMetadata {
            output,
            node_count: nodes.len(),
            edge_count: edges.len(),
            leaf_count: nodes
                .iter()
                .filter(|node| node.group == NodeGroup::Leaf)
                .count(),
            depth: depth.get(&output).copied().unwrap_or(0),
        };

        Ok(Self {
            nodes,
            edges,
            metadata,
        })
    }

    /// Find a node by its id.
    pub fn find_node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Shortest dependency path from `from` to `to`, following edges from
    /// parent to child.
    ///
    /// # Algorithm
    ///
    /// Breadth-first search over the edge list.
    pub fn find_path(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        self.find_node(from)?;
        if from == to {
            return Some(vec![from]);
        }

        let adjacency: HashMap<NodeId, Vec<NodeId>> =
            self.edges.iter().fold(HashMap::new(), |mut acc, edge| {
                acc.entry(edge.source).or_default().push(edge.target);
                acc
            });

        let mut queue: VecDeque<Vec<NodeId>> = VecDeque::new();
        let mut visited: HashSet<NodeId> = HashSet::new();

        queue.push_back(vec![from]);
        visited.insert(from);

        while let Some(path) = queue.pop_front() {
            let Some(&current) = path.last() else {
                continue;
            };

            for &neighbour in adjacency.get(&current).into_iter().flatten() {
                if !visited.insert(neighbour) {
                    continue;
                }
                let mut next = path.clone();
                next.push(neighbour);
                if neighbour == to {
                    return Some(next);
                }
                queue.push_back(next);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AadSession;

    #[test]
    fn test_export_excludes_unrelated_nodes() {
        let session = AadSession::new();
        let x = session.create_leaf(2.0).unwrap();
        let unrelated = session.create_leaf(9.0).unwrap();
        let _noise = unrelated.exp().unwrap();
        let y = session.create_leaf(3.0).unwrap();
        let z = x.mult(y).unwrap().add(x.squared().unwrap()).unwrap();

        let graph = session.graph(&z).unwrap();
        let ids: Vec<NodeId> = graph.nodes.iter().map(|node| node.id).collect();
        assert_eq!(ids, vec![x.id(), y.id(), NodeId(4), NodeId(5), z.id()]);
        assert_eq!(graph.metadata.leaf_count, 2);
        assert_eq!(graph.metadata.edge_count, 5);
        assert_eq!(graph.metadata.depth, 2);
        assert_eq!(graph.find_node(z.id()).unwrap().group, NodeGroup::Output);
        assert_eq!(graph.find_node(NodeId(4)).unwrap().label, "MULT");
        assert!(graph.find_node(unrelated.id()).is_none());
    }

    #[test]
    fn test_edges_keep_argument_slots() {
        let session = AadSession::new();
        let x = session.create_leaf(4.0).unwrap();
        let z = x.bus(1.0).unwrap();

        let graph = session.graph(&z).unwrap();
        let constant = graph
            .nodes
            .iter()
            .find(|node| node.group == NodeGroup::Constant)
            .unwrap();
        assert_eq!(constant.label, "constant");

        let slots: Vec<(NodeId, usize)> = graph.edges.iter().map(|e| (e.source, e.slot)).collect();
        assert_eq!(slots, vec![(constant.id, 0), (x.id(), 1)]);
    }

    #[test]
    fn test_find_path() {
        let session = AadSession::new();
        let x = session.create_leaf(0.5).unwrap();
        let s = x.sin().unwrap();
        let e = s.exp().unwrap();
        let z = e.add(x).unwrap();

        let graph = session.graph(&z).unwrap();
        assert_eq!(graph.find_path(x.id(), z.id()), Some(vec![x.id(), z.id()]));
        assert_eq!(
            graph.find_path(s.id(), z.id()),
            Some(vec![s.id(), e.id(), z.id()])
        );
        assert_eq!(graph.find_path(z.id(), x.id()), None);
        assert_eq!(graph.find_path(x.id(), x.id()), Some(vec![x.id()]));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialises_edges_as_links() {
        let session = AadSession::new();
        let x = session.create_leaf(1.0).unwrap();
        let z = x.exp().unwrap();

        let json = serde_json::to_value(session.graph(&z).unwrap()).unwrap();
        assert!(json.get("links").is_some());
        assert_eq!(json["nodes"][0]["group"], "leaf");
        assert_eq!(json["nodes"][1]["operator"], "EXP");
    }
}
