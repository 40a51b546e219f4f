//! Error types for the hostgraph time-series store.
//!
//! Day-to-day store operations do not fail: unknown hosts or graphs produce
//! empty results and rejected samples are reported as `false`. The errors
//! here cover construction and lifecycle only.

use thiserror::Error;

/// The main error type for fallible hostgraph operations.
#[derive(Error, Debug)]
pub enum HostgraphError {
    /// The store configuration is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The background sweeper could not be managed.
    #[error("sweep error: {0}")]
    Sweep(#[from] SweepError),
}

/// Errors raised by [`StoreConfig::validate`](crate::StoreConfig::validate).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The default TTL is negative.
    #[error("default ttl must be >= 0 seconds, got {ttl_secs}")]
    NegativeTtl {
        /// The rejected TTL in seconds.
        ttl_secs: i64,
    },

    /// The sweep interval is zero, which would spin the sweeper thread.
    #[error("sweep interval must be non-zero")]
    ZeroSweepInterval,
}

/// Errors raised while starting the expiry sweeper.
#[derive(Error, Debug)]
pub enum SweepError {
    /// The OS refused to spawn the sweeper thread.
    #[error("failed to spawn sweeper thread: {source}")]
    Spawn {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Type alias for `Result<T, HostgraphError>`.
pub type Result<T> = std::result::Result<T, HostgraphError>;
