//! Reference scenarios command.
//!
//! Records three small expressions, each on its own session, and prints the
//! forward value and the gradient with respect to every leaf:
//! - `x * y + x^2` at `x = 2`, `y = 3`
//! - `log(exp(x))` at `x = 1`
//! - `x / c` at `x = 4` with `c = 2` recorded as a constant

use aad_core::{AadResult, AadSession, DifferentiableVariable, NodeId, SessionConfig};
use serde::Serialize;
use tracing::info;

use super::OutputFormat;
use crate::Result;

/// Sensitivity of a scenario output to one named leaf.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sensitivity {
    /// Leaf name
    pub leaf: &'static str,
    /// Tape id of the leaf
    pub id: NodeId,
    /// Path-averaged sensitivity
    pub value: f64,
}

/// Result of one scenario.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioReport {
    /// Expression that was recorded
    pub expression: &'static str,
    /// Forward value of the output
    pub value: f64,
    /// Number of nodes recorded
    pub tape_len: usize,
    /// Gradient entries in discovery order
    pub gradient: Vec<Sensitivity>,
}

/// Output of a scenario and its named leaves.
type Recorded<'s> = (DifferentiableVariable<'s>, Vec<(&'static str, NodeId)>);

type Builder = for<'s> fn(&'s AadSession) -> AadResult<Recorded<'s>>;

fn product_plus_square(session: &AadSession) -> AadResult<Recorded<'_>> {
    let x = session.create_leaf(2.0)?;
    let y = session.create_leaf(3.0)?;
    let z = x.mult(y)?.add(x.squared()?)?;
    Ok((z, vec![("x", x.id()), ("y", y.id())]))
}

fn exp_log_round_trip(session: &AadSession) -> AadResult<Recorded<'_>> {
    let x = session.create_leaf(1.0)?;
    let z = x.exp()?.log()?;
    Ok((z, vec![("x", x.id())]))
}

fn division_by_constant(session: &AadSession) -> AadResult<Recorded<'_>> {
    let x = session.create_leaf(4.0)?;
    let c = session.create_constant(2.0)?;
    let z = x.div(c)?;
    Ok((z, vec![("x", x.id()), ("c", c.id())]))
}

const SCENARIOS: [(&str, Builder); 3] = [
    ("x * y + x^2", product_plus_square),
    ("log(exp(x))", exp_log_round_trip),
    ("x / c", division_by_constant),
];

/// Runs every scenario on a fresh session.
///
/// # Errors
///
/// Returns the first recording or backward sweep failure.
pub fn evaluate(config: &SessionConfig) -> Result<Vec<ScenarioReport>> {
    SCENARIOS
        .iter()
        .map(|&(expression, build)| -> Result<ScenarioReport> {
            let session = AadSession::with_config(config.clone())?;
            let (output, names) = build(&session)?;
            let gradient = session.gradient(&output)?;

            let gradient = gradient
                .iter()
                .map(|(id, sensitivity)| Sensitivity {
                    leaf: names
                        .iter()
                        .find(|(_, leaf)| leaf == id)
                        .map_or("?", |(name, _)| *name),
                    id: *id,
                    value: sensitivity.average(),
                })
                .collect();

            info!(expression, tape_len = session.len(), "scenario evaluated");
            Ok(ScenarioReport {
                expression,
                value: output.value().average(),
                tape_len: session.len(),
                gradient,
            })
        })
        .collect()
}

/// Runs the scenarios command.
pub fn run(config: &SessionConfig, format: OutputFormat) -> Result<()> {
    let reports = evaluate(config)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Table => {
            println!("========================================");
            println!("AAD Reference Scenarios");
            println!("========================================");
            for report in &reports {
                println!();
                println!("{}  =  {:.6}  ({} nodes)", report.expression, report.value, report.tape_len);
                println!("----------------------------------------");
                println!("{:<8} {:<6} {:>15}", "Leaf", "Id", "d/dLeaf");
                for entry in &report.gradient {
                    println!("{:<8} {:<6} {:>15.6}", entry.leaf, entry.id.index(), entry.value);
                }
            }
        }
    }
    Ok(())
}
