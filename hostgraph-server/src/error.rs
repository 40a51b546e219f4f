//! Startup errors for the hostgraph server.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop the server from starting.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind '{addr}': {source}")]
    Bind {
        /// The address that was requested.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file could not be read.
    #[error("failed to read config '{}': {source}", path.display())]
    ConfigRead {
        /// The config file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for a store config.
    #[error("failed to parse config '{}': {source}", path.display())]
    ConfigParse {
        /// The config file path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The store or its sweeper could not be started.
    #[error(transparent)]
    Store(#[from] hostgraph::HostgraphError),
}
