//! # aad_core: Tape-Based Reverse-Mode AAD for Monte Carlo Random Variables
//!
//! ## Role
//!
//! aad_core records arithmetic on Monte Carlo path vectors as nodes on a
//! session-scoped tape and computes, in one backward sweep, the gradient of an
//! output with respect to every true variable it depends on:
//! - Path vectors with broadcasting arithmetic and statistics (`types::random_variable`)
//! - Append-only node registry (`tape`)
//! - Forward evaluation and derivative rules of the ten operators (`operator`)
//! - Differentiable variables and their factory session (`variable`, `session`)
//! - Backward sweep and leaf discovery (`gradient`)
//! - Graph export for inspection (`graph`)
//! - Independent sessions on the rayon pool (`parallel`)
//!
//! ## Usage Examples
//!
//! ```rust
//! use aad_core::{AadSession, RandomVariable};
//!
//! let session = AadSession::new();
//! let spot = session
//!     .create_leaf(RandomVariable::new(1.0, vec![95.0, 100.0, 110.0]).unwrap())
//!     .unwrap();
//! let rate = session.create_leaf(0.03).unwrap();
//!
//! // Discounted terminal value: spot / (1 + rate * 1.0)
//! let pv = spot.discount(rate, 1.0).unwrap();
//! let gradient = pv.gradient().unwrap();
//!
//! assert_eq!(gradient.ids(), vec![spot.id(), rate.id()]);
//! let delta = gradient.get(spot.id()).unwrap();
//! assert!((delta.as_scalar().unwrap() - 1.0 / 1.03).abs() < 1e-12);
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` (default): `parallel::par_sessions` on the rayon pool
//! - `serde` (default): Serialisation of values, gradients, graphs and configuration

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod gradient;
pub mod graph;
pub mod operator;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod session;
pub mod tape;
pub mod types;
pub mod variable;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use gradient::{Adjoints, Gradient, GradientEngine};
pub use operator::OperatorType;
pub use session::AadSession;
pub use tape::{NodeId, Tape};
pub use types::{AadError, AadResult, RandomVariable};
pub use variable::{DifferentiableVariable, Operand};
