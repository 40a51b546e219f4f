//! The root store: entry point for every push, query and sweep.
//!
//! # Design
//!
//! The store owns a map of hosts, each host a map of graphs, each graph a
//! TTL plus a map of fields. Entries are created on first push and never
//! removed; only individual samples expire.
//!
//! - Writes ([`Store::push`]) walk down the tree with one get-or-create per
//!   level, releasing each lock before taking the next.
//! - Reads ([`Store::latest_items`], [`Store::fields`]) walk down without
//!   creating anything and take the graph lock for a consistent view.
//! - Sweeps ([`Store::sweep`]) and snapshots ([`Store::snapshot`]) hold the
//!   store, host and graph locks nested top-down while they iterate.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use hostgraph::{ManualClock, Store, StoreConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let clock = Arc::new(ManualClock::new(1_000));
//! let store = Store::with_clock(StoreConfig::default(), clock.clone())?;
//!
//! assert!(store.push("web1", "cpu", "user", 12.5, 990));
//! assert!(store.push("web1", "cpu", "user", 14.0, 1_000));
//!
//! let items = store.latest_items("web1", "cpu", 995);
//! assert_eq!(items["user"].len(), 1);
//!
//! // Default TTL is 60s: at t=1051 the sample from t=990 is stale.
//! clock.set(1_051);
//! let report = store.sweep();
//! assert_eq!(report.samples_removed, 1);
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::registry::{ExpireCount, GraphRegistry, GraphState, HostRegistry};
use crate::series::Sample;

/// Summary of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Graphs whose fields were expired successfully.
    pub graphs_swept: usize,
    /// Fields visited.
    pub fields_swept: usize,
    /// Samples removed.
    pub samples_removed: usize,
    /// Graphs whose sweep panicked and was skipped.
    pub failed_graphs: usize,
}

/// Entry and sample counts across the whole store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of hosts.
    pub hosts: usize,
    /// Number of graphs across all hosts.
    pub graphs: usize,
    /// Number of fields across all graphs.
    pub fields: usize,
    /// Number of samples currently held.
    pub samples: usize,
}

/// In-memory host/graph/field time-series store.
///
/// # Thread Safety
///
/// `Store` is `Send + Sync`; share it as `Arc<Store>` between request
/// handlers and the [`Sweeper`](crate::Sweeper).
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    hosts: Mutex<HashMap<String, Arc<HostRegistry>>>,
}

impl Store {
    /// Creates an empty store on the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](crate::ConfigError) if the configuration is invalid.
    pub fn new(config: StoreConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty store reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](crate::ConfigError) if the configuration is invalid.
    pub fn with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            hosts: Mutex::new(HashMap::new()),
        })
    }

    /// The store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Returns the named host, creating it if needed.
    pub fn host(&self, name: &str) -> Arc<HostRegistry> {
        let mut hosts = self.hosts.lock();
        if let Some(host) = hosts.get(name) {
            return Arc::clone(host);
        }
        let host = Arc::new(HostRegistry::new());
        hosts.insert(name.to_owned(), Arc::clone(&host));
        host
    }

    /// Returns the (host, graph) registry, creating either level if needed.
    ///
    /// New graphs start with [`StoreConfig::default_ttl_secs`].
    pub fn graph(&self, host: &str, graph: &str) -> Arc<GraphRegistry> {
        self.host(host).graph(graph, self.config.default_ttl_secs)
    }

    /// Looks up an existing (host, graph) without creating anything.
    pub fn find_graph(&self, host: &str, graph: &str) -> Option<Arc<GraphRegistry>> {
        let host = self.hosts.lock().get(host).cloned()?;
        host.get_graph(graph)
    }

    /// Host names, sorted.
    pub fn hosts(&self) -> Vec<String> {
        let mut names: Vec<String> = self.hosts.lock().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Records one sample, creating the host, graph and field on first use.
    ///
    /// Returns `false` if the series rejected the sample because its
    /// timestamp is not after the oldest stored one; see
    /// [`FieldSeries::push`](crate::FieldSeries::push).
    pub fn push(&self, host: &str, graph: &str, field: &str, value: f64, timestamp: i64) -> bool {
        let registry = self.graph(host, graph);
        let accepted = registry.lock().field(field).push(Sample::new(timestamp, value));

        if !accepted {
            tracing::debug!(host, graph, field, timestamp, "sample rejected: not newer than oldest sample");
        }

        accepted
    }

    /// Records one sample stamped with the store clock's current time.
    pub fn push_now(&self, host: &str, graph: &str, field: &str, value: f64) -> bool {
        self.push(host, graph, field, value, self.now())
    }

    /// Sets the TTL of an existing graph.
    ///
    /// Does nothing if the host or graph is unknown; unlike `push`, this
    /// never creates entries.
    pub fn set_expire(&self, host: &str, graph: &str, ttl_secs: i64) {
        let Some(registry) = self.find_graph(host, graph) else {
            return;
        };

        if registry.lock().set_ttl_secs(ttl_secs) {
            tracing::debug!(host, graph, ttl_secs, "graph ttl changed");
        }
    }

    /// TTL of a graph in seconds, or `None` if the host or graph is unknown.
    pub fn ttl(&self, host: &str, graph: &str) -> Option<i64> {
        self.find_graph(host, graph).map(|g| g.lock().ttl_secs())
    }

    /// TTL of a graph in seconds, or `0` if the host or graph is unknown.
    ///
    /// `0` is also a legal TTL; use [`Store::ttl`] when the two must be told
    /// apart.
    pub fn get_expire(&self, host: &str, graph: &str) -> i64 {
        self.ttl(host, graph).unwrap_or(0)
    }

    /// Field names registered under a graph, sorted. Empty if unknown.
    pub fn fields(&self, host: &str, graph: &str) -> Vec<String> {
        self.find_graph(host, graph)
            .map(|g| g.lock().field_names())
            .unwrap_or_default()
    }

    /// Per-field samples with `timestamp >= since`, ascending.
    ///
    /// `since == 0` returns every sample. Unknown host or graph yields an
    /// empty map.
    pub fn latest_items(&self, host: &str, graph: &str, since: i64) -> BTreeMap<String, Vec<Sample>> {
        self.find_graph(host, graph)
            .map(|g| g.lock().latest_items(since))
            .unwrap_or_default()
    }

    /// Runs one expiry pass at the clock's current time.
    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(self.now())
    }

    /// Runs one expiry pass as if the time were `now`.
    ///
    /// Every graph drops the samples older than `now - ttl`. A graph whose
    /// expiry panics is logged, counted in
    /// [`SweepReport::failed_graphs`] and skipped; the pass continues.
    pub fn sweep_at(&self, now: i64) -> SweepReport {
        self.sweep_with(|state| state.expire(now))
    }

    /// Runs `expire` on every graph under the store, host and graph locks.
    fn sweep_with(&self, mut expire: impl FnMut(&mut GraphState) -> ExpireCount) -> SweepReport {
        let mut report = SweepReport::default();

        let hosts = self.hosts.lock();
        for (host_name, host) in hosts.iter() {
            let graphs = host.lock_graphs();
            for (graph_name, graph) in graphs.iter() {
                let expired = expire_isolated(host_name, graph_name, || expire(&mut *graph.lock()));
                match expired {
                    Some(count) => {
                        report.graphs_swept += 1;
                        report.fields_swept += count.fields;
                        report.samples_removed += count.samples;
                    }
                    None => report.failed_graphs += 1,
                }
            }
        }

        report
    }

    /// Counts hosts, graphs, fields and samples.
    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats::default();

        let hosts = self.hosts.lock();
        stats.hosts = hosts.len();
        for host in hosts.values() {
            let graphs = host.lock_graphs();
            stats.graphs += graphs.len();
            for graph in graphs.values() {
                let state = graph.lock();
                stats.fields += state.field_count();
                stats.samples += state.sample_count();
            }
        }

        stats
    }

    /// Text dump of every host, graph, field and sample.
    ///
    /// Taken under the store, host and graph locks, so the result is a
    /// consistent picture of the whole tree.
    pub fn snapshot(&self) -> String {
        self.to_string()
    }
}

/// Runs one graph's expiry, turning a panic into `None`.
///
/// The graph guard is dropped while unwinding and `parking_lot` mutexes do
/// not poison, so the graph stays usable afterwards.
fn expire_isolated(host: &str, graph: &str, f: impl FnOnce() -> ExpireCount) -> Option<ExpireCount> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(count) => Some(count),
        Err(_) => {
            tracing::error!(host, graph, "graph sweep panicked, skipping");
            None
        }
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const ARROW: &str = "--> ";
        const INDENT: &str = "    ";

        let hosts = self.hosts.lock();
        let mut host_names: Vec<&String> = hosts.keys().collect();
        host_names.sort_unstable();

        for host_name in host_names {
            writeln!(f, "{host_name}")?;

            let graphs = hosts[host_name].lock_graphs();
            let mut graph_names: Vec<&String> = graphs.keys().collect();
            graph_names.sort_unstable();

            for graph_name in graph_names {
                let state = graphs[graph_name].lock();
                writeln!(f, "{ARROW}{graph_name} ttl={}s", state.ttl_secs())?;

                for (field_name, series) in state.sorted_fields() {
                    writeln!(f, "{INDENT}{ARROW}{field_name}")?;
                    write!(f, "{INDENT}{INDENT}{ARROW}{} elements: [", series.len())?;
                    for (i, sample) in series.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" ")?;
                        }
                        write!(f, "{}:{}", sample.timestamp, sample.value)?;
                    }
                    writeln!(f, "]")?;
                }
            }
        }

        Ok(())
    }
}
