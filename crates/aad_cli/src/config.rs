//! CLI configuration.
//!
//! Settings are resolved in layers, later layers overriding earlier ones:
//! 1. Built-in defaults
//! 2. The TOML file given by `--config` (optional; a missing file is skipped)
//! 3. `AAD_`-prefixed environment variables, with `__` between nested keys
//!    (e.g. `AAD_SESSION__MAX_NODES=100000`, `AAD_DEMO__SPOT=105`)
//!
//! # Example `aad.toml`
//!
//! ```toml
//! [session]
//! initial_capacity = 1024
//! max_nodes = 1000000
//!
//! [demo]
//! spot = 100.0
//! strike = 95.0
//! rate = 0.03
//! volatility = 0.2
//! maturity = 1.0
//! draws = [-1.2, -0.4, 0.4, 1.2]
//! ```

use aad_core::SessionConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CliError, Result};

/// Standard normal quantiles at `(i - 0.5) / 8`, symmetric around zero.
const DEFAULT_DRAWS: [f64; 8] = [
    -1.534_120_544_352_546,
    -0.887_146_559_018_876,
    -0.488_776_411_114_669,
    -0.157_310_684_610_171,
    0.157_310_684_610_171,
    0.488_776_411_114_669,
    0.887_146_559_018_876,
    1.534_120_544_352_546,
];

/// Resolved CLI configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Tape settings for every session the CLI opens
    pub session: SessionConfig,
    /// Market and simulation inputs for `aad demo`
    pub demo: DemoConfig,
}

/// Black-Scholes inputs for the discounted forward demo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Spot price
    pub spot: f64,
    /// Forward strike
    pub strike: f64,
    /// Continuously compounded risk-free rate
    pub rate: f64,
    /// Lognormal volatility
    pub volatility: f64,
    /// Time to maturity in years
    pub maturity: f64,
    /// Standard normal draws, one per path
    pub draws: Vec<f64>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            spot: 100.0,
            strike: 100.0,
            rate: 0.03,
            volatility: 0.2,
            maturity: 1.0,
            draws: DEFAULT_DRAWS.to_vec(),
        }
    }
}

impl DemoConfig {
    /// Validates the demo inputs.
    ///
    /// # Errors
    ///
    /// Returns `CliError::InvalidParameter` if a price or the maturity is not
    /// positive, the volatility is negative, or no draws are configured.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("spot", self.spot),
            ("strike", self.strike),
            ("maturity", self.maturity),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(CliError::InvalidParameter {
                    name,
                    reason: format!("{} must be positive and finite", value),
                });
            }
        }
        if !(self.volatility >= 0.0 && self.volatility.is_finite()) {
            return Err(CliError::InvalidParameter {
                name: "volatility",
                reason: format!("{} must be non-negative", self.volatility),
            });
        }
        if self.draws.is_empty() {
            return Err(CliError::InvalidParameter {
                name: "draws",
                reason: "at least one draw is required".to_string(),
            });
        }
        Ok(())
    }
}

impl CliConfig {
    /// Loads defaults, then `path` if it exists, then the environment.
    ///
    /// # Errors
    ///
    /// - `CliError::Config` if a source cannot be parsed
    /// - `CliError::Aad` if the session settings fail validation
    /// - `CliError::InvalidParameter` if the demo settings fail validation
    pub fn load(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("AAD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let resolved: CliConfig = settings.try_deserialize()?;
        resolved.session.validate()?;
        resolved.demo.validate()?;
        debug!(path, ?resolved, "configuration resolved");
        Ok(resolved)
    }
}
