//! Store configuration.
//!
//! A [`StoreConfig`] is fixed when the store is built. It carries the TTL
//! handed to every newly created graph and the period of the expiry sweep.
//! Per-graph TTLs can be changed later through
//! [`Store::set_expire`](crate::Store::set_expire).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// TTL assigned to a graph when it is first created, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 60;

/// How often the sweeper walks the store.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for a [`Store`](crate::Store).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use hostgraph::StoreConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = StoreConfig {
///     default_ttl_secs: 600,
///     sweep_interval: Duration::from_millis(500),
/// };
/// config.validate()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// TTL given to newly created graphs, in seconds.
    ///
    /// Zero is legal and means samples expire on the next sweep.
    pub default_ttl_secs: i64,

    /// Period of the background expiry sweep.
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: DEFAULT_TTL_SECS,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl StoreConfig {
    /// Checks the configuration for values the store cannot run with.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NegativeTtl`] if `default_ttl_secs` is below zero
    /// - [`ConfigError::ZeroSweepInterval`] if `sweep_interval` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ttl_secs < 0 {
            return Err(ConfigError::NegativeTtl {
                ttl_secs: self.default_ttl_secs,
            });
        }

        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }

        Ok(())
    }
}
