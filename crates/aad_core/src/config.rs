//! Differentiation session configuration.
//!
//! This module provides configuration types and builders for
//! [`AadSession`](crate::AadSession). Configurations deserialise from TOML
//! (feature `serde`), so the service layer can load them through the
//! `config` crate.

use crate::types::{AadError, AadResult};

/// Hard upper bound on the number of nodes a tape may hold.
pub const MAX_TAPE_NODES: usize = 50_000_000;

/// Default number of nodes reserved when a tape is created.
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// Differentiation session configuration.
///
/// Use [`SessionConfigBuilder`] to construct validated instances.
///
/// # Examples
///
/// ```rust
/// use aad_core::SessionConfig;
///
/// let config = SessionConfig::builder()
///     .initial_capacity(1_024)
///     .max_nodes(100_000)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.initial_capacity(), 1_024);
/// assert_eq!(config.max_nodes(), Some(100_000));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Nodes reserved up front.
    initial_capacity: usize,
    /// Optional limit on tape growth.
    max_nodes: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_nodes: None,
        }
    }
}

impl SessionConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Returns the number of nodes reserved when the tape is created.
    #[inline]
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Returns the node limit, if any.
    #[inline]
    pub fn max_nodes(&self) -> Option<usize> {
        self.max_nodes
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `AadError::InvalidConfig` if:
    /// - `initial_capacity` exceeds [`MAX_TAPE_NODES`]
    /// - `max_nodes` is 0 or exceeds [`MAX_TAPE_NODES`]
    /// - `initial_capacity` exceeds `max_nodes`
    pub fn validate(&self) -> AadResult<()> {
        if self.initial_capacity > MAX_TAPE_NODES {
            return Err(AadError::InvalidConfig {
                name: "initial_capacity",
                reason: format!(
                    "{} exceeds the tape limit of {}",
                    self.initial_capacity, MAX_TAPE_NODES
                ),
            });
        }
        if let Some(limit) = self.max_nodes {
            if limit == 0 || limit > MAX_TAPE_NODES {
                return Err(AadError::InvalidConfig {
                    name: "max_nodes",
                    reason: format!("{} must be in range [1, {}]", limit, MAX_TAPE_NODES),
                });
            }
            if self.initial_capacity > limit {
                return Err(AadError::InvalidConfig {
                    name: "initial_capacity",
                    reason: format!("{} exceeds max_nodes {}", self.initial_capacity, limit),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`SessionConfig`].
#[derive(Clone, Debug, Default)]
pub struct SessionConfigBuilder {
    initial_capacity: Option<usize>,
    max_nodes: Option<usize>,
}

impl SessionConfigBuilder {
    /// Sets the number of nodes reserved up front.
    #[inline]
    pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = Some(initial_capacity);
        self
    }

    /// Limits the number of nodes the tape may record.
    #[inline]
    pub fn max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `AadError::InvalidConfig` if validation fails.
    pub fn build(self) -> AadResult<SessionConfig> {
        let config = SessionConfig {
            initial_capacity: self.initial_capacity.unwrap_or(DEFAULT_INITIAL_CAPACITY),
            max_nodes: self.max_nodes,
        };
        config.validate()?;
        Ok(config)
    }
}
