//! Differentiation session: the factory that owns one tape.
//!
//! This module provides:
//! - `AadSession`: Records leaves, constants and operator applications
//!
//! # Scoping
//!
//! Each session owns an independent [`Tape`] behind a `RefCell`, so a session
//! is `Send` but not `Sync`: expressions are built on one thread, while
//! independent sessions can run in parallel (see `crate::parallel`). Variables
//! borrow their session, so the tape cannot be dropped while a handle to it is
//! still alive.
//!
//! # Example
//!
//! ```rust
//! use aad_core::AadSession;
//!
//! let session = AadSession::new();
//! let x = session.create_leaf(2.0).unwrap();
//! let y = session.create_leaf(3.0).unwrap();
//! let z = x.mult(y).unwrap().add(x.squared().unwrap()).unwrap();
//!
//! let gradient = session.gradient(&z).unwrap();
//! assert_eq!(gradient.get(x.id()).unwrap().as_scalar(), Some(7.0));
//! assert_eq!(gradient.get(y.id()).unwrap().as_scalar(), Some(2.0));
//! ```

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::gradient::{Adjoints, Gradient, GradientEngine};
use crate::graph::ComputationGraph;
use crate::operator::{evaluate, OperatorType};
use crate::tape::{Node, NodeId, NodeOrigin, Tape};
use crate::types::{AadError, AadResult, RandomVariable};
use crate::variable::{DifferentiableVariable, Operand};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(0);

/// Owner of one tape and factory for the variables recorded on it.
#[derive(Debug)]
pub struct AadSession {
    id: u64,
    tape: RefCell<Tape>,
    config: SessionConfig,
}

impl Default for AadSession {
    fn default() -> Self {
        Self::build(SessionConfig::default())
    }
}

impl AadSession {
    /// Creates a session with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `AadError::InvalidConfig` if `config` fails validation.
    pub fn with_config(config: SessionConfig) -> AadResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SessionConfig) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            session = id,
            initial_capacity = config.initial_capacity(),
            max_nodes = ?config.max_nodes(),
            "session opened"
        );
        Self {
            id,
            tape: RefCell::new(Tape::with_config(&config)),
            config,
        }
    }

    /// Process-unique session identifier.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Configuration the session was created with.
    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Number of recorded nodes.
    pub fn len(&self) -> usize {
        self.tape.borrow().len()
    }

    /// `true` if nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.tape.borrow().is_empty()
    }

    // =========================================================================
    // Recording
    // =========================================================================

    /// Records a true variable.
    ///
    /// # Errors
    ///
    /// Returns `AadError::TapeCapacityExceeded` if the tape is full.
    pub fn create_leaf(&self, value: impl Into<RandomVariable>) -> AadResult<DifferentiableVariable<'_>> {
        let id = self.record(value.into(), NodeOrigin::Leaf)?;
        Ok(DifferentiableVariable::new(self, id))
    }

    /// Records a constant: it takes part in expressions but never receives
    /// a gradient entry.
    ///
    /// # Errors
    ///
    /// Returns `AadError::TapeCapacityExceeded` if the tape is full.
    pub fn create_constant(
        &self,
        value: impl Into<RandomVariable>,
    ) -> AadResult<DifferentiableVariable<'_>> {
        let id = self.record(value.into(), NodeOrigin::Constant)?;
        Ok(DifferentiableVariable::new(self, id))
    }

    /// Applies `operator` to `operands` and records the result.
    ///
    /// Untracked operands are recorded as constants first, in operand order,
    /// then the derived node is recorded with the operands as parents in
    /// argument order. The forward value is computed before anything is
    /// recorded, so a failing operation leaves the tape untouched.
    ///
    /// # Errors
    ///
    /// - `AadError::ArityMismatch` if the operand count does not match
    /// - `AadError::ForeignVariable` if a tracked operand belongs to another session
    /// - `AadError::DimensionMismatch` if stochastic operands differ in size
    /// - `AadError::TapeCapacityExceeded` if the tape is full
    pub fn apply<'s>(
        &'s self,
        operator: OperatorType,
        operands: impl IntoIterator<Item = Operand<'s>>,
    ) -> AadResult<DifferentiableVariable<'s>> {
        let operands: Vec<Operand<'s>> = operands.into_iter().collect();
        if operands.len() != operator.arity() {
            return Err(AadError::ArityMismatch {
                operator: operator.name(),
                expected: operator.arity(),
                got: operands.len(),
            });
        }
        for operand in &operands {
            if let Operand::Tracked(variable) = operand {
                self.check_owned(variable)?;
            }
        }

        let mut tape = self.tape.borrow_mut();

        let values: Vec<RandomVariable> = operands
            .iter()
            .map(|operand| match operand {
                Operand::Tracked(variable) => tape[variable.id()].value().clone(),
                Operand::Untracked(value) => value.clone(),
            })
            .collect();
        let refs: Vec<&RandomVariable> = values.iter().collect();
        let result = evaluate(operator, &refs).inspect_err(|err| {
            warn!(session = self.id, operator = %operator, error = %err, "forward evaluation failed");
        })?;

        let untracked = operands
            .iter()
            .filter(|operand| matches!(operand, Operand::Untracked(_)))
            .count();
        if let Some(limit) = self.config.max_nodes() {
            if tape.len() + untracked + 1 > limit {
                return Err(AadError::TapeCapacityExceeded { limit });
            }
        }

        let mut parents = Vec::with_capacity(operands.len());
        for (operand, value) in operands.into_iter().zip(values) {
            let parent = match operand {
                Operand::Tracked(variable) => variable.id(),
                Operand::Untracked(_) => {
                    let id = tape.append(value, NodeOrigin::Constant)?;
                    trace!(session = self.id, node = id.index(), "implicit constant recorded");
                    id
                }
            };
            parents.push(parent);
        }

        let id = tape.append(result, NodeOrigin::Derived { operator, parents })?;
        trace!(session = self.id, node = id.index(), operator = %operator, "node recorded");
        Ok(DifferentiableVariable::new(self, id))
    }

    /// Runs a multi-node recording as one unit: if `build` fails, every node
    /// it recorded is removed again.
    pub(crate) fn atomic<T>(&self, build: impl FnOnce() -> AadResult<T>) -> AadResult<T> {
        let start = self.len();
        build().inspect_err(|err| {
            let mut tape = self.tape.borrow_mut();
            debug!(
                session = self.id,
                dropped = tape.len() - start,
                error = %err,
                "composite operation rolled back"
            );
            tape.rollback(start);
        })
    }

    fn record(&self, value: RandomVariable, origin: NodeOrigin) -> AadResult<NodeId> {
        let kind = match origin {
            NodeOrigin::Constant => "constant",
            _ => "leaf",
        };
        let id = self.tape.borrow_mut().append(value, origin)?;
        trace!(session = self.id, node = id.index(), kind, "node recorded");
        Ok(id)
    }

    fn check_owned(&self, variable: &DifferentiableVariable<'_>) -> AadResult<()> {
        let found = variable.session().id();
        if found == self.id {
            Ok(())
        } else {
            Err(AadError::ForeignVariable {
                id: variable.id().index(),
                expected: self.id,
                found,
            })
        }
    }

    // =========================================================================
    // Backward sweep
    // =========================================================================

    /// Gradient of `output` with respect to every leaf it depends on.
    ///
    /// # Errors
    ///
    /// - `AadError::ForeignVariable` if `output` belongs to another session
    /// - Any failure of the backward sweep
    pub fn gradient(&self, output: &DifferentiableVariable<'_>) -> AadResult<Gradient> {
        self.check_owned(output)?;
        let tape = self.tape.borrow();
        GradientEngine::new(&tape).compute(output.id())
    }

    /// Adjoints of every node up to `output`.
    ///
    /// # Errors
    ///
    /// Same as [`AadSession::gradient`].
    pub fn adjoints(&self, output: &DifferentiableVariable<'_>) -> AadResult<Adjoints> {
        self.check_owned(output)?;
        let tape = self.tape.borrow();
        GradientEngine::new(&tape).adjoints(output.id())
    }

    /// Ancestry of `output` as a node/edge graph.
    ///
    /// # Errors
    ///
    /// Returns `AadError::ForeignVariable` if `output` belongs to another session.
    pub fn graph(&self, output: &DifferentiableVariable<'_>) -> AadResult<ComputationGraph> {
        self.check_owned(output)?;
        let tape = self.tape.borrow();
        ComputationGraph::from_tape(&tape, output.id())
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Copy of the node with the given id.
    ///
    /// # Errors
    ///
    /// Returns `AadError::OutOfRange` if `id` is not on the tape.
    pub fn node(&self, id: NodeId) -> AadResult<Node> {
        self.tape.borrow().get(id).cloned()
    }

    /// Runs `f` with shared access to the tape.
    ///
    /// # Panics
    ///
    /// Panics if `f` records on this session.
    pub fn with_tape<R>(&self, f: impl FnOnce(&Tape) -> R) -> R {
        f(&self.tape.borrow())
    }

    pub(crate) fn with_node<R>(&self, id: NodeId, f: impl FnOnce(&Node) -> R) -> R {
        f(&self.tape.borrow()[id])
    }

    /// Human-readable listing of every recorded node.
    pub fn dump(&self) -> String {
        self.tape.borrow().dump()
    }

    /// Consumes the session and returns its tape.
    pub fn into_tape(self) -> Tape {
        self.tape.into_inner()
    }
}
