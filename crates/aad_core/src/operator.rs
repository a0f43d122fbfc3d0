//! Operator dispatcher: forward evaluation and local partial derivatives.
//!
//! This module provides:
//! - `OperatorType`: The ten operators the tape can record
//! - `evaluate`: Forward value of an operator applied to its operands
//! - `local_partial`: Derivative of an operator with respect to one argument slot
//! - `partial_derivative`: Jacobian entry of a recorded node with respect to a node id
//!
//! # Derivative Rules
//!
//! | operator | d/dp0 | d/dp1 |
//! |---|---|---|
//! | ADD | 1 | 1 |
//! | SUB | 1 | -1 |
//! | MULT | p1 | p0 |
//! | DIV | 1/p1 | -p0/p1^2 |
//! | SQUARED | 2 p0 | |
//! | SQRT | 0.5/sqrt(p0) | |
//! | EXP | exp(p0) | |
//! | LOG | 1/p0 | |
//! | SIN | cos(p0) | |
//! | COS | -sin(p0) | |
//!
//! Argument order is significant: SUB and DIV distinguish minuend/subtrahend
//! and numerator/denominator by slot, never by value.

use std::fmt;
use std::str::FromStr;

use crate::tape::{NodeId, Tape};
use crate::types::{AadError, AadResult, RandomVariable};

/// Operator that produced a derived node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum OperatorType {
    /// `p0 + p1`
    Add,
    /// `p0 - p1`
    Sub,
    /// `p0 * p1`
    Mult,
    /// `p0 / p1`
    Div,
    /// `p0 * p0`
    Squared,
    /// `sqrt(p0)`
    Sqrt,
    /// `ln(p0)`
    Log,
    /// `sin(p0)`
    Sin,
    /// `cos(p0)`
    Cos,
    /// `exp(p0)`
    Exp,
}

impl OperatorType {
    /// Every operator, binary ones first.
    pub const ALL: [OperatorType; 10] = [
        OperatorType::Add,
        OperatorType::Sub,
        OperatorType::Mult,
        OperatorType::Div,
        OperatorType::Squared,
        OperatorType::Sqrt,
        OperatorType::Log,
        OperatorType::Sin,
        OperatorType::Cos,
        OperatorType::Exp,
    ];

    /// Number of operands the operator takes.
    #[inline]
    pub fn arity(self) -> usize {
        match self {
            OperatorType::Add | OperatorType::Sub | OperatorType::Mult | OperatorType::Div => 2,
            _ => 1,
        }
    }

    /// Upper-case tag used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            OperatorType::Add => "ADD",
            OperatorType::Sub => "SUB",
            OperatorType::Mult => "MULT",
            OperatorType::Div => "DIV",
            OperatorType::Squared => "SQUARED",
            OperatorType::Sqrt => "SQRT",
            OperatorType::Log => "LOG",
            OperatorType::Sin => "SIN",
            OperatorType::Cos => "COS",
            OperatorType::Exp => "EXP",
        }
    }

    fn check_arity(self, got: usize) -> AadResult<()> {
        if got != self.arity() {
            return Err(AadError::ArityMismatch {
                operator: self.name(),
                expected: self.arity(),
                got,
            });
        }
        Ok(())
    }
}

impl fmt::Display for OperatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperatorType {
    type Err = AadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperatorType::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AadError::UnsupportedOperator(s.to_string()))
    }
}

/// Evaluates `operator` on `operands` in argument order.
///
/// # Errors
///
/// - `AadError::ArityMismatch` if the operand count does not match the operator
/// - `AadError::DimensionMismatch` if two stochastic operands differ in size
///
/// # Example
///
/// ```rust
/// use aad_core::operator::{evaluate, OperatorType};
/// use aad_core::types::RandomVariable;
///
/// let a = RandomVariable::deterministic(6.0);
/// let b = RandomVariable::deterministic(3.0);
/// let quotient = evaluate(OperatorType::Div, &[&a, &b]).unwrap();
/// assert_eq!(quotient.as_scalar(), Some(2.0));
/// ```
pub fn evaluate(operator: OperatorType, operands: &[&RandomVariable]) -> AadResult<RandomVariable> {
    operator.check_arity(operands.len())?;
    let p0 = operands[0];
    let result = match operator {
        OperatorType::Add => p0.add(operands[1])?,
        OperatorType::Sub => p0.sub(operands[1])?,
        OperatorType::Mult => p0.mult(operands[1])?,
        OperatorType::Div => p0.div(operands[1])?,
        OperatorType::Squared => p0.squared(),
        OperatorType::Sqrt => p0.sqrt(),
        OperatorType::Log => p0.log(),
        OperatorType::Sin => p0.sin(),
        OperatorType::Cos => p0.cos(),
        OperatorType::Exp => p0.exp(),
    };
    Ok(result)
}

/// Derivative of `operator` with respect to the argument in `slot`,
/// evaluated at the recorded `parents`.
///
/// # Errors
///
/// - `AadError::ArityMismatch` if `parents` does not match the operator
/// - `AadError::OutOfRange` if `slot` is not an argument position
pub fn local_partial(
    operator: OperatorType,
    parents: &[&RandomVariable],
    slot: usize,
) -> AadResult<RandomVariable> {
    operator.check_arity(parents.len())?;
    if slot >= parents.len() {
        return Err(AadError::OutOfRange {
            id: slot,
            len: parents.len(),
        });
    }
    let p0 = parents[0];
    let partial = match (operator, slot) {
        (OperatorType::Add, _) => RandomVariable::deterministic(1.0),
        (OperatorType::Sub, 0) => RandomVariable::deterministic(1.0),
        (OperatorType::Sub, _) => RandomVariable::deterministic(-1.0),
        (OperatorType::Mult, 0) => parents[1].clone(),
        (OperatorType::Mult, _) => p0.clone(),
        (OperatorType::Div, 0) => parents[1].invert(),
        (OperatorType::Div, _) => p0.div(&parents[1].squared())?.mult_scalar(-1.0),
        (OperatorType::Squared, _) => p0.mult_scalar(2.0),
        (OperatorType::Sqrt, _) => p0.sqrt().invert().mult_scalar(0.5),
        (OperatorType::Exp, _) => p0.exp(),
        (OperatorType::Log, _) => p0.invert(),
        (OperatorType::Sin, _) => p0.cos(),
        (OperatorType::Cos, _) => p0.sin().mult_scalar(-1.0),
    };
    Ok(partial)
}

/// Jacobian entry of node `node_id` with respect to node `variable_id`.
///
/// Parent slots are scanned in recorded order and the rule of every slot
/// holding `variable_id` is added up. With distinct parents this is exactly
/// the rule of the single matching slot; when both arguments are the same
/// node (`x - x`, `x * x`) the slots combine into the total derivative.
/// This departs from a first-slot tie-break, which would report `1` for
/// `x - x` and `1 / x` for `x / x` instead of `0`.
/// A variable that is not a parent yields a deterministic zero.
///
/// # Errors
///
/// - `AadError::OutOfRange` if either id is not on the tape
pub fn partial_derivative(
    tape: &Tape,
    node_id: NodeId,
    variable_id: NodeId,
) -> AadResult<RandomVariable> {
    let node = tape.get(node_id)?;
    tape.get(variable_id)?;

    let Some(operator) = node.operator() else {
        return Ok(RandomVariable::deterministic(0.0));
    };

    let parents = node
        .parent_ids()
        .iter()
        .map(|&id| tape.get(id).map(|parent| parent.value()))
        .collect::<AadResult<Vec<_>>>()?;

    let mut total: Option<RandomVariable> = None;
    for (slot, _) in node
        .parent_ids()
        .iter()
        .enumerate()
        .filter(|(_, id)| **id == variable_id)
    {
        let partial = local_partial(operator, &parents, slot)?;
        total = Some(match total {
            Some(acc) => acc.add(&partial)?,
            None => partial,
        });
    }
    Ok(total.unwrap_or_else(|| RandomVariable::deterministic(0.0)))
}
