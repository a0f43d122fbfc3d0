//! Independent differentiation sessions on the rayon pool.
//!
//! A session's tape is confined to the thread that builds it, so parallelism
//! happens one level up: every input gets its own [`AadSession`], built,
//! swept and dropped inside a single rayon task. Nothing is shared between
//! sessions apart from the read-only configuration and inputs.
//!
//! # Example
//!
//! ```rust
//! use aad_core::parallel::par_sessions;
//! use aad_core::SessionConfig;
//!
//! let outcomes = par_sessions(&SessionConfig::default(), &[1.0, 2.0, 3.0], |session, &x| {
//!     session.create_leaf(x)?.squared()
//! })
//! .unwrap();
//!
//! let slopes: Vec<f64> = outcomes
//!     .iter()
//!     .map(|outcome| outcome.gradient.iter().next().unwrap().1.as_scalar().unwrap())
//!     .collect();
//! assert_eq!(slopes, vec![2.0, 4.0, 6.0]);
//! ```

use rayon::prelude::*;
use tracing::debug;

use crate::config::SessionConfig;
use crate::gradient::Gradient;
use crate::session::AadSession;
use crate::types::{AadResult, RandomVariable};
use crate::variable::DifferentiableVariable;

/// Forward value and gradient produced by one session.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SessionOutcome {
    /// Forward value of the output
    pub value: RandomVariable,
    /// Gradient of the output with respect to its leaves
    pub gradient: Gradient,
    /// Number of nodes the session recorded
    pub tape_len: usize,
}

/// Builds one session per input in parallel and differentiates its output.
///
/// `build` records the expression for one input and returns its output.
/// Outcomes are returned in input order.
///
/// # Errors
///
/// - `AadError::InvalidConfig` if `config` fails validation
/// - The first failure raised by any `build` call or backward sweep
pub fn par_sessions<I, F>(
    config: &SessionConfig,
    inputs: &[I],
    build: F,
) -> AadResult<Vec<SessionOutcome>>
where
    I: Sync,
    F: for<'s> Fn(&'s AadSession, &I) -> AadResult<DifferentiableVariable<'s>> + Send + Sync,
{
    config.validate()?;
    debug!(
        sessions = inputs.len(),
        threads = rayon::current_num_threads(),
        "parallel sessions started"
    );

    inputs
        .par_iter()
        .map(|input| -> AadResult<SessionOutcome> {
            let session = AadSession::with_config(config.clone())?;
            let output = build(&session, input)?;
            let gradient = session.gradient(&output)?;
            Ok(SessionOutcome {
                value: output.value(),
                gradient,
                tape_len: session.len(),
            })
        })
        .collect()
}
