//! Error types for structured error handling.
//!
//! This module provides:
//! - `AadError`: Every failure raised by the tape, the operator dispatcher,
//!   differentiable variables and the gradient engine
//! - `AadResult<T>`: Result alias used throughout the crate
//!
//! # Propagation
//!
//! Nothing in the core retries or substitutes a default value. A failure is
//! returned to the caller of the operation that triggered it, and a backward
//! sweep either completes or returns an error before any gradient is built.

use thiserror::Error;

/// Result alias for automatic differentiation operations.
pub type AadResult<T> = Result<T, AadError>;

/// Categorised automatic differentiation errors.
///
/// # Variants
/// - `UnsupportedOperator`: Operator tag without a forward or derivative rule
/// - `OutOfRange`: Node id outside `[0, tape.len())`
/// - `MissingEqualityContract`: Equality between differentiable variables requested
/// - `NotImplemented`: Operation deliberately not tracked by the tape
/// - `ArityMismatch`: Operator applied to the wrong number of operands
/// - `DimensionMismatch`: Two stochastic vectors with different path counts
/// - `EmptyRealizations`: Random variable built from an empty slice
/// - `InvalidParent`: Parent id not strictly smaller than the child id
/// - `ForeignVariable`: Variable recorded on a different session
/// - `TapeCapacityExceeded`: Tape grew beyond the configured node limit
/// - `InvalidConfig`: Session configuration failed validation
///
/// # Examples
/// ```
/// use aad_core::types::AadError;
///
/// let err = AadError::OutOfRange { id: 7, len: 3 };
/// assert_eq!(format!("{}", err), "Node id 7 out of range for tape of length 3");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AadError {
    /// Operator tag has no forward evaluation or derivative rule.
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Node id outside the tape.
    #[error("Node id {id} out of range for tape of length {len}")]
    OutOfRange {
        /// Requested node id
        id: usize,
        /// Tape length at the time of the request
        len: usize,
    },

    /// Structural equality between differentiable variables is not defined.
    #[error("Equality is not defined for differentiable variables; compare forward values instead")]
    MissingEqualityContract,

    /// Operation exists on the numeric vector but is not recorded on the tape.
    #[error("Operation not implemented for differentiable variables: {0}")]
    NotImplemented(&'static str),

    /// Operator applied to the wrong number of operands.
    #[error("Operator {operator} expects {expected} operand(s), got {got}")]
    ArityMismatch {
        /// Operator name
        operator: &'static str,
        /// Operand count required by the operator
        expected: usize,
        /// Operand count supplied
        got: usize,
    },

    /// Elementwise operation on stochastic vectors of different sizes.
    #[error("Dimension mismatch: {left} paths vs {right} paths")]
    DimensionMismatch {
        /// Path count of the left operand
        left: usize,
        /// Path count of the right operand
        right: usize,
    },

    /// A node may only depend on nodes recorded before it.
    #[error("Invalid parent {parent} for node {child}: parents must precede their children")]
    InvalidParent {
        /// Offending parent id
        parent: usize,
        /// Id the new node would have received
        child: usize,
    },

    /// Variable belongs to another differentiation session.
    #[error("Variable {id} belongs to session {found}, expected session {expected}")]
    ForeignVariable {
        /// Node id of the foreign variable
        id: usize,
        /// Session the operation runs on
        expected: u64,
        /// Session that recorded the variable
        found: u64,
    },

    /// The tape reached its configured node limit.
    #[error("Tape capacity exceeded: limit of {limit} nodes")]
    TapeCapacityExceeded {
        /// Configured maximum number of nodes
        limit: usize,
    },

    /// A random variable needs at least one realization.
    #[error("Random variable requires at least one realization")]
    EmptyRealizations,

    /// Invalid session configuration.
    #[error("Invalid configuration '{name}': {reason}")]
    InvalidConfig {
        /// Parameter name
        name: &'static str,
        /// Description of the invalid value
        reason: String,
    },
}

impl AadError {
    /// Returns `true` for failures that indicate a programming error in the
    /// caller rather than a property of the data.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AadError::OutOfRange { .. }
                | AadError::InvalidParent { .. }
                | AadError::ForeignVariable { .. }
                | AadError::ArityMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AadError::UnsupportedOperator("POW".to_string());
        assert_eq!(err.to_string(), "Unsupported operator: POW");

        let err = AadError::ArityMismatch {
            operator: "SQRT",
            expected: 1,
            got: 2,
        };
        assert!(err.to_string().contains("expects 1 operand(s), got 2"));

        let err = AadError::NotImplemented("cap");
        assert!(err.to_string().contains("cap"));

        let err = AadError::DimensionMismatch { left: 4, right: 3 };
        assert!(err.to_string().contains("4 paths vs 3 paths"));
    }

    #[test]
    fn test_caller_error_classification() {
        assert!(AadError::OutOfRange { id: 1, len: 0 }.is_caller_error());
        assert!(AadError::InvalidParent {
            parent: 4,
            child: 2
        }
        .is_caller_error());
        assert!(!AadError::NotImplemented("floor").is_caller_error());
        assert!(!AadError::MissingEqualityContract.is_caller_error());
    }
}
