//! Monte Carlo random variable (one value per simulation path).
//!
//! This module provides:
//! - `RandomVariable`: Immutable vector of realizations with a filtration time
//!
//! # Deterministic vs Stochastic
//!
//! A random variable holding a single realization is deterministic and
//! broadcasts against stochastic operands, so a constant such as a strike or
//! a seed adjoint of `1.0` never has to be expanded to the path count.
//!
//! # Sharing
//!
//! Realizations live behind an `Arc<[f64]>`. Values are written once at
//! construction; cloning only bumps a reference count, which lets the tape and
//! the derivative rules hand the same forward values around freely.
//!
//! # Example
//!
//! ```rust
//! use aad_core::types::RandomVariable;
//!
//! let spot = RandomVariable::new(1.0, vec![98.0, 101.0, 103.0]).unwrap();
//! let strike = RandomVariable::deterministic(100.0);
//!
//! let moneyness = spot.sub(&strike).unwrap();
//! assert_eq!(moneyness.realizations(), &[-2.0, 1.0, 3.0]);
//! assert_eq!(moneyness.filtration_time(), 1.0);
//! ```

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

use super::error::{AadError, AadResult};

/// Immutable vector of Monte Carlo realizations.
///
/// Every arithmetic method returns a new value; nothing mutates in place.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RandomVariableData"))]
pub struct RandomVariable {
    /// Time up to which the variable is measurable.
    filtration_time: f64,
    /// One value per path, or a single value for a deterministic variable.
    realizations: Arc<[f64]>,
}

/// Unvalidated wire form, checked by [`RandomVariable::new`] on the way in.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RandomVariableData {
    filtration_time: f64,
    realizations: Vec<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<RandomVariableData> for RandomVariable {
    type Error = AadError;

    fn try_from(data: RandomVariableData) -> AadResult<Self> {
        Self::new(data.filtration_time, data.realizations)
    }
}

impl RandomVariable {
    /// Creates a random variable from its realizations.
    ///
    /// # Errors
    ///
    /// Returns `AadError::EmptyRealizations` if `realizations` is empty.
    pub fn new(filtration_time: f64, realizations: impl Into<Vec<f64>>) -> AadResult<Self> {
        let realizations = realizations.into();
        if realizations.is_empty() {
            return Err(AadError::EmptyRealizations);
        }
        Ok(Self {
            filtration_time,
            realizations: realizations.into(),
        })
    }

    /// Creates a deterministic random variable at time zero.
    #[inline]
    pub fn deterministic(value: f64) -> Self {
        Self::deterministic_at(0.0, value)
    }

    /// Creates a deterministic random variable at the given filtration time.
    #[inline]
    pub fn deterministic_at(filtration_time: f64, value: f64) -> Self {
        Self {
            filtration_time,
            realizations: Arc::from([value]),
        }
    }

    /// Returns the filtration time.
    #[inline]
    pub fn filtration_time(&self) -> f64 {
        self.filtration_time
    }

    /// Returns the number of stored realizations (1 if deterministic).
    #[inline]
    pub fn size(&self) -> usize {
        self.realizations.len()
    }

    /// Returns `true` if the variable holds a single broadcast value.
    #[inline]
    pub fn is_deterministic(&self) -> bool {
        self.realizations.len() == 1
    }

    /// Returns the realization on `path`; deterministic variables return
    /// their value for every path.
    ///
    /// # Errors
    ///
    /// Returns `AadError::OutOfRange` if `path` exceeds the path count of a
    /// stochastic variable.
    pub fn get(&self, path: usize) -> AadResult<f64> {
        if self.is_deterministic() {
            return Ok(self.realizations[0]);
        }
        self.realizations
            .get(path)
            .copied()
            .ok_or(AadError::OutOfRange {
                id: path,
                len: self.realizations.len(),
            })
    }

    /// Returns the stored realizations.
    #[inline]
    pub fn realizations(&self) -> &[f64] {
        &self.realizations
    }

    /// Returns the value of a deterministic variable, `None` otherwise.
    #[inline]
    pub fn as_scalar(&self) -> Option<f64> {
        if self.is_deterministic() {
            Some(self.realizations[0])
        } else {
            None
        }
    }

    // =========================================================================
    // Elementwise kernels
    // =========================================================================

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            filtration_time: self.filtration_time,
            realizations: self.realizations.iter().map(|&x| f(x)).collect(),
        }
    }

    fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> AadResult<Self> {
        let realizations: Arc<[f64]> = match (self.is_deterministic(), other.is_deterministic()) {
            (true, true) => Arc::from([f(self.realizations[0], other.realizations[0])]),
            (true, false) => {
                let a = self.realizations[0];
                other.realizations.iter().map(|&b| f(a, b)).collect()
            }
            (false, true) => {
                let b = other.realizations[0];
                self.realizations.iter().map(|&a| f(a, b)).collect()
            }
            (false, false) => {
                if self.size() != other.size() {
                    return Err(AadError::DimensionMismatch {
                        left: self.size(),
                        right: other.size(),
                    });
                }
                self.realizations
                    .iter()
                    .zip(other.realizations.iter())
                    .map(|(&a, &b)| f(a, b))
                    .collect()
            }
        };
        Ok(Self {
            filtration_time: self.filtration_time.max(other.filtration_time),
            realizations,
        })
    }

    /// Elementwise `self + other`.
    pub fn add(&self, other: &Self) -> AadResult<Self> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Elementwise `self - other`.
    pub fn sub(&self, other: &Self) -> AadResult<Self> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Elementwise `self * other`.
    pub fn mult(&self, other: &Self) -> AadResult<Self> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Elementwise `self / other`.
    pub fn div(&self, other: &Self) -> AadResult<Self> {
        self.zip_with(other, |a, b| a / b)
    }

    /// Elementwise `min(self, cap)`.
    pub fn cap(&self, cap: &Self) -> AadResult<Self> {
        self.zip_with(cap, f64::min)
    }

    /// Elementwise `max(self, floor)`.
    pub fn floor(&self, floor: &Self) -> AadResult<Self> {
        self.zip_with(floor, f64::max)
    }

    /// Adds a scalar to every realization.
    pub fn add_scalar(&self, value: f64) -> Self {
        self.map(|x| x + value)
    }

    /// Subtracts a scalar from every realization.
    pub fn sub_scalar(&self, value: f64) -> Self {
        self.map(|x| x - value)
    }

    /// Multiplies every realization by a scalar.
    pub fn mult_scalar(&self, value: f64) -> Self {
        self.map(|x| x * value)
    }

    /// Divides every realization by a scalar.
    pub fn div_scalar(&self, value: f64) -> Self {
        self.map(|x| x / value)
    }

    /// Raises every realization to `exponent`.
    pub fn pow(&self, exponent: f64) -> Self {
        self.map(|x| x.powf(exponent))
    }

    /// Elementwise `x * x`.
    pub fn squared(&self) -> Self {
        self.map(|x| x * x)
    }

    /// Elementwise square root.
    pub fn sqrt(&self) -> Self {
        self.map(f64::sqrt)
    }

    /// Elementwise exponential.
    pub fn exp(&self) -> Self {
        self.map(f64::exp)
    }

    /// Elementwise natural logarithm.
    pub fn log(&self) -> Self {
        self.map(f64::ln)
    }

    /// Elementwise sine.
    pub fn sin(&self) -> Self {
        self.map(f64::sin)
    }

    /// Elementwise cosine.
    pub fn cos(&self) -> Self {
        self.map(f64::cos)
    }

    /// Elementwise `1 / x`.
    pub fn invert(&self) -> Self {
        self.map(|x| 1.0 / x)
    }

    /// Elementwise absolute value.
    pub fn abs(&self) -> Self {
        self.map(f64::abs)
    }

    // =========================================================================
    // Reductions
    // =========================================================================

    /// Arithmetic mean over all paths.
    pub fn average(&self) -> f64 {
        self.realizations.iter().sum::<f64>() / self.size() as f64
    }

    /// Smallest realization.
    pub fn min(&self) -> f64 {
        self.realizations.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest realization.
    pub fn max(&self) -> f64 {
        self.realizations
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Population variance (zero for deterministic variables).
    pub fn variance(&self) -> f64 {
        if self.is_deterministic() {
            return 0.0;
        }
        let mean = self.average();
        self.realizations
            .iter()
            .map(|&x| (x - mean) * (x - mean))
            .sum::<f64>()
            / self.size() as f64
    }

    /// Unbiased sample variance (zero for deterministic variables).
    pub fn sample_variance(&self) -> f64 {
        if self.is_deterministic() {
            return 0.0;
        }
        let n = self.size() as f64;
        self.variance() * n / (n - 1.0)
    }

    /// Square root of the population variance.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Monte Carlo standard error of the mean.
    pub fn std_error(&self) -> f64 {
        (self.variance() / self.size() as f64).sqrt()
    }

    /// Empirical quantile using the nearest-rank rule on `(n + 1) * q - 1`.
    pub fn quantile(&self, quantile: f64) -> f64 {
        let mut sorted = self.realizations.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let index = (((n + 1) as f64) * quantile - 1.0).round();
        let index = index.clamp(0.0, (n - 1) as f64) as usize;
        sorted[index]
    }
}

impl From<f64> for RandomVariable {
    fn from(value: f64) -> Self {
        Self::deterministic(value)
    }
}

impl fmt::Display for RandomVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_scalar() {
            Some(value) => write!(f, "t={} deterministic {}", self.filtration_time, value),
            None => write!(
                f,
                "t={} paths={} mean={:.6} min={:.6} max={:.6}",
                self.filtration_time,
                self.size(),
                self.average(),
                self.min(),
                self.max()
            ),
        }
    }
}

// =============================================================================
// Operator overloads
// =============================================================================

// Operators on references panic on a dimension mismatch, the same contract
// ndarray uses for incompatible shapes. Use the named methods to get an error.
macro_rules! impl_elementwise_operator {
    ($trait:ident, $method:ident, $named:ident) => {
        impl $trait<&RandomVariable> for &RandomVariable {
            type Output = RandomVariable;

            /// # Panics
            ///
            /// Panics if both operands are stochastic with different path counts.
            fn $method(self, rhs: &RandomVariable) -> RandomVariable {
                match RandomVariable::$named(self, rhs) {
                    Ok(result) => result,
                    Err(err) => panic!("{}", err),
                }
            }
        }

        impl $trait<f64> for &RandomVariable {
            type Output = RandomVariable;

            fn $method(self, rhs: f64) -> RandomVariable {
                self.map(|x| $trait::$method(x, rhs))
            }
        }
    };
}

impl_elementwise_operator!(Add, add, add);
impl_elementwise_operator!(Sub, sub, sub);
impl_elementwise_operator!(Mul, mul, mult);
impl_elementwise_operator!(Div, div, div);

impl Neg for &RandomVariable {
    type Output = RandomVariable;

    fn neg(self) -> RandomVariable {
        self.map(|x| -x)
    }
}
