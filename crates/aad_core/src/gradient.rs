//! Reverse-mode gradient engine.
//!
//! This module provides:
//! - `GradientEngine`: Backward sweep over a [`Tape`]
//! - `Adjoints`: Adjoint (`omega`) of every node with respect to one output
//! - `Gradient`: Per-leaf sensitivities in discovery order
//!
//! # Algorithm
//!
//! 1. Seed the adjoint of the output with a deterministic `1.0`; every other
//!    adjoint starts at zero.
//! 2. Visit node ids in strictly decreasing order starting at the output.
//!    A visited derived node pushes `partial(node, parent) * omega[node]`
//!    into the adjoint of each of its parents. Because parents always precede
//!    their children, every contribution to a node has arrived before the
//!    node itself is visited.
//! 3. Discover the leaves reachable from the output by a depth-first walk of
//!    the parent ids (first discovery wins, duplicates skipped).
//! 4. Report `omega[leaf]` for every discovered leaf.
//!
//! Leaf discovery is the only source of truth for which nodes are true
//! variables; no assumption is made about where leaves sit on the tape.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::operator::local_partial;
use crate::tape::{NodeId, Tape};
use crate::types::{AadError, AadResult, RandomVariable};

/// Adjoints of all nodes up to and including one output.
#[derive(Clone, Debug)]
pub struct Adjoints {
    output: NodeId,
    omega: Vec<Option<RandomVariable>>,
}

impl Adjoints {
    /// Output the adjoints were seeded from.
    #[inline]
    pub fn output(&self) -> NodeId {
        self.output
    }

    /// Adjoint of `id`; zero for nodes the output does not depend on.
    ///
    /// # Errors
    ///
    /// Returns `AadError::OutOfRange` for ids recorded after the output.
    pub fn get(&self, id: NodeId) -> AadResult<RandomVariable> {
        match self.omega.get(id.index()) {
            Some(Some(adjoint)) => Ok(adjoint.clone()),
            Some(None) => Ok(RandomVariable::deterministic(0.0)),
            None => Err(AadError::OutOfRange {
                id: id.index(),
                len: self.omega.len(),
            }),
        }
    }

    /// `true` if at least one contribution reached `id` during the sweep.
    pub fn is_reached(&self, id: NodeId) -> bool {
        matches!(self.omega.get(id.index()), Some(Some(_)))
    }

    /// Number of adjoint slots (output id + 1).
    #[inline]
    pub fn len(&self) -> usize {
        self.omega.len()
    }

    /// Always `false`: the output slot exists.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.omega.is_empty()
    }
}

/// Gradient of one output with respect to the leaves it depends on.
///
/// Entries appear in the order the leaves were first discovered by the
/// depth-first walk from the output. Constants and unused leaves never
/// appear.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Gradient {
    entries: Vec<(NodeId, RandomVariable)>,
}

impl Gradient {
    /// Number of leaves in the gradient.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the output depends on no leaf.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sensitivity with respect to the leaf `id`, if it is part of the gradient.
    pub fn get(&self, id: NodeId) -> Option<&RandomVariable> {
        self.entries
            .iter()
            .find(|(leaf, _)| *leaf == id)
            .map(|(_, value)| value)
    }

    /// Leaf ids in discovery order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    /// Iterates over `(leaf id, sensitivity)` pairs.
    pub fn iter(&self) -> std::slice::Iter<'_, (NodeId, RandomVariable)> {
        self.entries.iter()
    }

    /// Consumes the gradient into its ordered entries.
    pub fn into_vec(self) -> Vec<(NodeId, RandomVariable)> {
        self.entries
    }
}

impl IntoIterator for Gradient {
    type Item = (NodeId, RandomVariable);
    type IntoIter = std::vec::IntoIter<(NodeId, RandomVariable)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Gradient {
    type Item = &'a (NodeId, RandomVariable);
    type IntoIter = std::slice::Iter<'a, (NodeId, RandomVariable)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Backward sweep over a borrowed tape.
#[derive(Clone, Copy, Debug)]
pub struct GradientEngine<'t> {
    tape: &'t Tape,
}

impl<'t> GradientEngine<'t> {
    /// Creates an engine reading from `tape`.
    pub fn new(tape: &'t Tape) -> Self {
        Self { tape }
    }

    /// Runs the backward sweep from `output` and returns every adjoint.
    ///
    /// # Errors
    ///
    /// - `AadError::OutOfRange` if `output` is not on the tape
    /// - `AadError::DimensionMismatch` if recorded values disagree in size
    pub fn adjoints(&self, output: NodeId) -> AadResult<Adjoints> {
        self.tape.get(output)?;

        let mut omega: Vec<Option<RandomVariable>> = vec![None; output.index() + 1];
        omega[output.index()] = Some(RandomVariable::deterministic(1.0));

        debug!(output = output.index(), tape_len = self.tape.len(), "backward sweep started");

        for index in (0..=output.index()).rev() {
            let Some(adjoint) = omega[index].clone() else {
                continue;
            };
            let node = self.tape.get(NodeId(index))?;
            let Some(operator) = node.operator() else {
                continue;
            };

            let parents = node
                .parent_ids()
                .iter()
                .map(|&id| self.tape.get(id).map(|parent| parent.value()))
                .collect::<AadResult<Vec<_>>>()?;

            for (slot, parent) in node.parent_ids().iter().enumerate() {
                let contribution = local_partial(operator, &parents, slot)?.mult(&adjoint)?;
                let accumulated = match omega[parent.index()].take() {
                    Some(previous) => previous.add(&contribution)?,
                    None => contribution,
                };
                omega[parent.index()] = Some(accumulated);
            }
            trace!(node = index, operator = %operator, "adjoint propagated");
        }

        Ok(Adjoints { output, omega })
    }

    /// Leaves the output depends on, in depth-first discovery order.
    ///
    /// Parents are explored in argument order; each leaf is recorded the
    /// first time it is reached. A leaf output is its own only leaf.
    ///
    /// # Errors
    ///
    /// Returns `AadError::OutOfRange` if `output` is not on the tape.
    pub fn discover_leaves(&self, output: NodeId) -> AadResult<Vec<NodeId>> {
        self.tape.get(output)?;

        let mut leaves = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![output];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = self.tape.get(id)?;
            if node.is_leaf() {
                leaves.push(id);
            }
            stack.extend(node.parent_ids().iter().rev().copied());
        }

        Ok(leaves)
    }

    /// Gradient of `output` with respect to every leaf it depends on.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the sweep; no partial gradient is returned.
    pub fn compute(&self, output: NodeId) -> AadResult<Gradient> {
        let adjoints = self.adjoints(output)?;
        let leaves = self.discover_leaves(output)?;

        let entries = leaves
            .into_iter()
            .map(|leaf| adjoints.get(leaf).map(|adjoint| (leaf, adjoint)))
            .collect::<AadResult<Vec<_>>>()?;

        debug!(output = output.index(), leaves = entries.len(), "gradient extracted");
        Ok(Gradient { entries })
    }
}
