//! # hostgraph
//!
//! In-memory host/graph/field time-series store with per-graph expiry.
//!
//! Collectors push timestamped numeric samples under a three-level key
//! (host, graph, field). Readers fetch everything a graph holds, or only
//! the samples since a given timestamp. A background sweeper drops samples
//! older than the graph's time-to-live.
//!
//! ## Key Properties
//!
//! - Entries are created lazily on first push and are never removed
//! - Samples are kept in timestamp order; late samples are inserted in place
//! - One lock per level, always taken top-down, so no deadlocks
//! - Nothing touches disk
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use hostgraph::{Store, StoreConfig, Sweeper};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(Store::new(StoreConfig::default())?);
//! let sweeper = Sweeper::spawn(Arc::clone(&store))?;
//!
//! let now = store.now();
//! store.push("web1", "cpu", "user", 12.5, now - 2);
//! store.push("web1", "cpu", "user", 14.0, now - 1);
//! store.push("web1", "cpu", "system", 3.0, now - 1);
//!
//! for (field, samples) in store.latest_items("web1", "cpu", now - 1) {
//!     println!("{field}: {samples:?}");
//! }
//!
//! sweeper.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`Store`] - Root of the tree; every push, query, sweep and dump goes through it
//! - [`HostRegistry`] / [`GraphRegistry`] - Lazily created tree levels; a graph owns the TTL
//! - [`FieldSeries`] - Ordered samples of one field
//! - [`Sweeper`] - Background thread expiring stale samples
//! - [`StoreConfig`] - Default TTL and sweep interval
//! - [`Clock`] - Time source for default timestamps and cutoffs

pub mod clock;
pub mod config;
pub mod error;
pub mod registry;
pub mod series;
pub mod store;
pub mod sweeper;

// Re-export primary API types at crate root for convenience.
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL_SECS, StoreConfig};
pub use error::{ConfigError, HostgraphError, Result, SweepError};
pub use registry::{ExpireCount, GraphRegistry, GraphState, HostRegistry};
pub use series::{FieldSeries, Sample};
pub use store::{Store, StoreStats, SweepReport};
pub use sweeper::Sweeper;
