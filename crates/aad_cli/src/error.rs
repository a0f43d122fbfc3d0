//! CLI error types.

use thiserror::Error;

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Failures surfaced by the `aad` commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// Differentiation failure from the core engine.
    #[error("AAD error: {0}")]
    Aad(#[from] aad_core::AadError),

    /// Configuration could not be loaded or deserialised.
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// Demo parameters out of their valid range.
    #[error("Invalid demo parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// A leaf the report needs is absent from the gradient.
    #[error("No sensitivity recorded for {leaf}")]
    MissingSensitivity {
        /// Leaf name
        leaf: &'static str,
    },

    /// JSON rendering failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML rendering failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}
