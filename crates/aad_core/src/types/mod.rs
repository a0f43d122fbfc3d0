//! Value and error types shared by every layer of the AAD engine.
//!
//! - `RandomVariable`: Monte Carlo path vector the tape records
//! - `AadError` / `AadResult`: Structured failures

pub mod error;
pub mod random_variable;

pub use error::{AadError, AadResult};
pub use random_variable::RandomVariable;
