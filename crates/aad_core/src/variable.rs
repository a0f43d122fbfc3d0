//! Differentiable variables and operands.
//!
//! This module provides:
//! - `DifferentiableVariable`: Copyable handle to a node recorded on an [`AadSession`]
//! - `Operand`: Tracked variable or untracked value entering an operation
//!
//! # Tracked vs Untracked
//!
//! Every operand is statically one of two kinds. A [`DifferentiableVariable`]
//! converts into `Operand::Tracked`; a [`RandomVariable`] or a plain `f64`
//! converts into `Operand::Untracked` and is recorded as a constant when the
//! operation is applied. A raw value never becomes a leaf, so it never
//! receives a gradient entry.
//!
//! # Reversed Operations
//!
//! `bus` (subtract from) and `vid` (divide into) record the same `SUB` and
//! `DIV` operators as `sub` and `div`, with the operands swapped.
//!
//! # Untracked Operations
//!
//! Operations whose derivative is not recorded on the tape (`pow`, `cap`,
//! `floor`, `abs`, `choose` and every statistic) fail with
//! `AadError::NotImplemented`. Statistics of the forward value are available
//! through `value()`.

use std::fmt;

use tracing::warn;

use crate::gradient::Gradient;
use crate::operator::OperatorType;
use crate::session::AadSession;
use crate::tape::NodeId;
use crate::types::{AadError, AadResult, RandomVariable};

/// Operand of a recorded operation.
#[derive(Clone, Debug)]
pub enum Operand<'s> {
    /// Variable already on the tape.
    Tracked(DifferentiableVariable<'s>),
    /// Raw value, recorded as a constant when used.
    Untracked(RandomVariable),
}

impl<'s> From<DifferentiableVariable<'s>> for Operand<'s> {
    fn from(variable: DifferentiableVariable<'s>) -> Self {
        Operand::Tracked(variable)
    }
}

impl<'s> From<&DifferentiableVariable<'s>> for Operand<'s> {
    fn from(variable: &DifferentiableVariable<'s>) -> Self {
        Operand::Tracked(*variable)
    }
}

impl From<RandomVariable> for Operand<'_> {
    fn from(value: RandomVariable) -> Self {
        Operand::Untracked(value)
    }
}

impl From<&RandomVariable> for Operand<'_> {
    fn from(value: &RandomVariable) -> Self {
        Operand::Untracked(value.clone())
    }
}

impl From<f64> for Operand<'_> {
    fn from(value: f64) -> Self {
        Operand::Untracked(RandomVariable::deterministic(value))
    }
}

/// Handle to a node recorded on an [`AadSession`].
///
/// Handles are `Copy`; the node itself lives on the session's tape and never
/// changes. Every operation records a new node and returns its handle.
#[derive(Clone, Copy)]
pub struct DifferentiableVariable<'s> {
    session: &'s AadSession,
    id: NodeId,
}

impl<'s> DifferentiableVariable<'s> {
    pub(crate) fn new(session: &'s AadSession, id: NodeId) -> Self {
        Self { session, id }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Node id on the session tape.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Session the variable was recorded on.
    #[inline]
    pub fn session(&self) -> &'s AadSession {
        self.session
    }

    /// Forward value.
    pub fn value(&self) -> RandomVariable {
        self.session.with_node(self.id, |node| node.value().clone())
    }

    /// Filtration time of the forward value.
    pub fn filtration_time(&self) -> f64 {
        self.session
            .with_node(self.id, |node| node.value().filtration_time())
    }

    /// Number of realizations of the forward value.
    pub fn size(&self) -> usize {
        self.session.with_node(self.id, |node| node.value().size())
    }

    /// `true` for true variables.
    pub fn is_leaf(&self) -> bool {
        self.session.with_node(self.id, |node| node.is_leaf())
    }

    /// `true` for constants.
    pub fn is_constant(&self) -> bool {
        self.session.with_node(self.id, |node| node.is_constant())
    }

    /// Operand ids in argument order.
    pub fn parent_ids(&self) -> Vec<NodeId> {
        self.session
            .with_node(self.id, |node| node.parent_ids().to_vec())
    }

    /// Operator that produced the variable.
    pub fn operator(&self) -> Option<OperatorType> {
        self.session.with_node(self.id, |node| node.operator())
    }

    /// Gradient of this variable with respect to its leaves.
    ///
    /// # Errors
    ///
    /// Propagates failures of the backward sweep.
    pub fn gradient(&self) -> AadResult<Gradient> {
        self.session.gradient(self)
    }

    /// Equality is not defined for differentiable variables.
    ///
    /// # Errors
    ///
    /// Always returns `AadError::MissingEqualityContract`; compare
    /// `value()` instead.
    pub fn equals(&self, _other: &DifferentiableVariable<'_>) -> AadResult<bool> {
        Err(AadError::MissingEqualityContract)
    }

    // =========================================================================
    // Recorded operations
    // =========================================================================

    fn unary(self, operator: OperatorType) -> AadResult<Self> {
        self.session.apply(operator, [Operand::from(self)])
    }

    fn binary(self, operator: OperatorType, other: impl Into<Operand<'s>>) -> AadResult<Self> {
        self.session
            .apply(operator, [Operand::from(self), other.into()])
    }

    fn reversed(self, operator: OperatorType, other: impl Into<Operand<'s>>) -> AadResult<Self> {
        self.session
            .apply(operator, [other.into(), Operand::from(self)])
    }

    /// `self + other`
    pub fn add(self, other: impl Into<Operand<'s>>) -> AadResult<Self> {
        self.binary(OperatorType::Add, other)
    }

    /// `self - other`
    pub fn sub(self, other: impl Into<Operand<'s>>) -> AadResult<Self> {
        self.binary(OperatorType::Sub, other)
    }

    /// `self * other`
    pub fn mult(self, other: impl Into<Operand<'s>>) -> AadResult<Self> {
        self.binary(OperatorType::Mult, other)
    }

    /// `self / other`
    pub fn div(self, other: impl Into<Operand<'s>>) -> AadResult<Self> {
        self.binary(OperatorType::Div, other)
    }

    /// `other - self`
    pub fn bus(self, other: impl Into<Operand<'s>>) -> AadResult<Self> {
        self.reversed(OperatorType::Sub, other)
    }

    /// `other / self`
    pub fn vid(self, other: impl Into<Operand<'s>>) -> AadResult<Self> {
        self.reversed(OperatorType::Div, other)
    }

    /// `self * self`
    pub fn squared(self) -> AadResult<Self> {
        self.unary(OperatorType::Squared)
    }

    /// Square root.
    pub fn sqrt(self) -> AadResult<Self> {
        self.unary(OperatorType::Sqrt)
    }

    /// Exponential.
    pub fn exp(self) -> AadResult<Self> {
        self.unary(OperatorType::Exp)
    }

    /// Natural logarithm.
    pub fn log(self) -> AadResult<Self> {
        self.unary(OperatorType::Log)
    }

    /// Sine.
    pub fn sin(self) -> AadResult<Self> {
        self.unary(OperatorType::Sin)
    }

    /// Cosine.
    pub fn cos(self) -> AadResult<Self> {
        self.unary(OperatorType::Cos)
    }

    // =========================================================================
    // Composites
    // =========================================================================
    //
    // Multi-node composites record atomically: on failure the tape is left
    // exactly as it was before the call.

    /// `1 / self`
    pub fn invert(self) -> AadResult<Self> {
        self.vid(1.0)
    }

    /// `self + value`, with `value` recorded as a constant.
    pub fn add_scalar(self, value: f64) -> AadResult<Self> {
        self.add(value)
    }

    /// `self - value`, with `value` recorded as a constant.
    pub fn sub_scalar(self, value: f64) -> AadResult<Self> {
        self.sub(value)
    }

    /// `self * value`, with `value` recorded as a constant.
    pub fn mult_scalar(self, value: f64) -> AadResult<Self> {
        self.mult(value)
    }

    /// `self / value`, with `value` recorded as a constant.
    pub fn div_scalar(self, value: f64) -> AadResult<Self> {
        self.div(value)
    }

    /// `self + factor1 * factor2`
    pub fn add_product(
        self,
        factor1: impl Into<Operand<'s>>,
        factor2: impl Into<Operand<'s>>,
    ) -> AadResult<Self> {
        self.session.atomic(|| {
            let product = self
                .session
                .apply(OperatorType::Mult, [factor1.into(), factor2.into()])?;
            self.add(product)
        })
    }

    /// `self + numerator / denominator`
    pub fn add_ratio(
        self,
        numerator: impl Into<Operand<'s>>,
        denominator: impl Into<Operand<'s>>,
    ) -> AadResult<Self> {
        self.session.atomic(|| {
            let ratio = self
                .session
                .apply(OperatorType::Div, [numerator.into(), denominator.into()])?;
            self.add(ratio)
        })
    }

    /// `self - numerator / denominator`
    pub fn sub_ratio(
        self,
        numerator: impl Into<Operand<'s>>,
        denominator: impl Into<Operand<'s>>,
    ) -> AadResult<Self> {
        self.session.atomic(|| {
            let ratio = self
                .session
                .apply(OperatorType::Div, [numerator.into(), denominator.into()])?;
            self.sub(ratio)
        })
    }

    /// `self * (1 + rate * period_length)`
    pub fn accrue(self, rate: impl Into<Operand<'s>>, period_length: f64) -> AadResult<Self> {
        self.session.atomic(|| {
            let factor = self.simple_compounding(rate, period_length)?;
            self.mult(factor)
        })
    }

    /// `self / (1 + rate * period_length)`
    pub fn discount(self, rate: impl Into<Operand<'s>>, period_length: f64) -> AadResult<Self> {
        self.session.atomic(|| {
            let factor = self.simple_compounding(rate, period_length)?;
            self.div(factor)
        })
    }

    fn simple_compounding(
        self,
        rate: impl Into<Operand<'s>>,
        period_length: f64,
    ) -> AadResult<Self> {
        self.session.atomic(|| {
            let accrued = self
                .session
                .apply(OperatorType::Mult, [rate.into(), Operand::from(period_length)])?;
            accrued.add_scalar(1.0)
        })
    }

    // =========================================================================
    // Not recorded on the tape
    // =========================================================================

    fn not_implemented(self, operation: &'static str) -> AadResult<Self> {
        warn!(
            session = self.session.id(),
            node = self.id.index(),
            operation,
            "operation is not tracked by the tape"
        );
        Err(AadError::NotImplemented(operation))
    }

    /// Power by a scalar exponent. Not tracked.
    pub fn pow(self, _exponent: f64) -> AadResult<Self> {
        self.not_implemented("pow")
    }

    /// Elementwise minimum with `cap`. Not tracked.
    pub fn cap(self, _cap: impl Into<Operand<'s>>) -> AadResult<Self> {
        self.not_implemented("cap")
    }

    /// Elementwise maximum with `floor`. Not tracked.
    pub fn floor(self, _floor: impl Into<Operand<'s>>) -> AadResult<Self> {
        self.not_implemented("floor")
    }

    /// Absolute value. Not tracked.
    pub fn abs(self) -> AadResult<Self> {
        self.not_implemented("abs")
    }

    /// Path-wise selection on the sign of `self`. Not tracked.
    pub fn choose(
        self,
        _value_if_non_negative: impl Into<Operand<'s>>,
        _value_if_negative: impl Into<Operand<'s>>,
    ) -> AadResult<Self> {
        self.not_implemented("choose")
    }

    /// Mean over paths. Not tracked.
    pub fn average(self) -> AadResult<Self> {
        self.not_implemented("average")
    }

    /// Minimum over paths. Not tracked.
    pub fn min(self) -> AadResult<Self> {
        self.not_implemented("min")
    }

    /// Maximum over paths. Not tracked.
    pub fn max(self) -> AadResult<Self> {
        self.not_implemented("max")
    }

    /// Population variance over paths. Not tracked.
    pub fn variance(self) -> AadResult<Self> {
        self.not_implemented("variance")
    }

    /// Sample variance over paths. Not tracked.
    pub fn sample_variance(self) -> AadResult<Self> {
        self.not_implemented("sample_variance")
    }

    /// Standard deviation over paths. Not tracked.
    pub fn std_dev(self) -> AadResult<Self> {
        self.not_implemented("std_dev")
    }

    /// Standard error of the mean. Not tracked.
    pub fn std_error(self) -> AadResult<Self> {
        self.not_implemented("std_error")
    }

    /// Empirical quantile over paths. Not tracked.
    pub fn quantile(self, _quantile: f64) -> AadResult<Self> {
        self.not_implemented("quantile")
    }
}

impl fmt::Debug for DifferentiableVariable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DifferentiableVariable")
            .field("session", &self.session.id())
            .field("id", &self.id)
            .finish()
    }
}

impl fmt::Display for DifferentiableVariable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.session
            .with_node(self.id, |node| fmt::Display::fmt(node, f))
    }
}
