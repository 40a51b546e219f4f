//! Host and graph registries.
//!
//! The store is a three-level tree:
//!
//! ```text
//! Store ──(host)──► HostRegistry ──(graph)──► GraphRegistry ──(field)──► FieldSeries
//!   mutex              mutex                      mutex (shared by all its fields)
//! ```
//!
//! Every level is created lazily by a single locked get-or-insert, so two
//! callers asking for the same key always get the same `Arc`. Locks are only
//! ever nested top-down (store, then host, then graph); nothing takes a
//! parent lock while holding a child's.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::series::{FieldSeries, Sample};

/// Mutable state of one graph: its TTL and its fields.
///
/// Only reachable through [`GraphRegistry::lock`], so the graph lock
/// serializes field creation, sample mutation and TTL changes together.
#[derive(Debug)]
pub struct GraphState {
    ttl_secs: i64,
    fields: HashMap<String, FieldSeries>,
}

/// Counts from expiring one graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpireCount {
    /// Fields visited.
    pub fields: usize,
    /// Samples removed across those fields.
    pub samples: usize,
}

impl GraphState {
    fn new(ttl_secs: i64) -> Self {
        Self {
            ttl_secs,
            fields: HashMap::new(),
        }
    }

    /// The graph's TTL in seconds.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Replaces the TTL. Returns whether the value changed.
    pub fn set_ttl_secs(&mut self, ttl_secs: i64) -> bool {
        if self.ttl_secs == ttl_secs {
            return false;
        }
        self.ttl_secs = ttl_secs;
        true
    }

    /// Returns the named field, creating an empty one if needed.
    pub fn field(&mut self, name: &str) -> &mut FieldSeries {
        self.fields.entry(name.to_owned()).or_default()
    }

    /// Returns the named field if it exists.
    pub fn get_field(&self, name: &str) -> Option<&FieldSeries> {
        self.fields.get(name)
    }

    /// Field names, sorted.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.fields.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Total samples across all fields.
    pub fn sample_count(&self) -> usize {
        self.fields.values().map(FieldSeries::len).sum()
    }

    /// Fields with their series, sorted by name.
    pub fn sorted_fields(&self) -> Vec<(&str, &FieldSeries)> {
        let mut fields: Vec<(&str, &FieldSeries)> = self
            .fields
            .iter()
            .map(|(name, series)| (name.as_str(), series))
            .collect();
        fields.sort_unstable_by_key(|&(name, _)| name);
        fields
    }

    /// Per-field samples with `timestamp >= since` (everything when `since == 0`).
    pub fn latest_items(&self, since: i64) -> BTreeMap<String, Vec<Sample>> {
        self.fields
            .iter()
            .map(|(name, series)| (name.clone(), series.since(since)))
            .collect()
    }

    /// Drops samples older than `now - ttl` from every field.
    pub fn expire(&mut self, now: i64) -> ExpireCount {
        let cutoff = now.saturating_sub(self.ttl_secs);
        let mut count = ExpireCount::default();
        for series in self.fields.values_mut() {
            count.fields += 1;
            count.samples += series.remove_prefix(cutoff);
        }
        count
    }
}

/// One (host, graph) pair: a TTL and a set of fields behind one lock.
#[derive(Debug)]
pub struct GraphRegistry {
    state: Mutex<GraphState>,
}

impl GraphRegistry {
    /// Creates an empty graph with the given TTL.
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            state: Mutex::new(GraphState::new(ttl_secs)),
        }
    }

    /// Locks the graph.
    ///
    /// Holding the guard blocks pushes, queries and sweeps for this graph
    /// only. Do not acquire store or host locks while holding it.
    pub fn lock(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock()
    }
}

/// All graphs reported by one host.
#[derive(Debug, Default)]
pub struct HostRegistry {
    graphs: Mutex<HashMap<String, Arc<GraphRegistry>>>,
}

impl HostRegistry {
    /// Creates a host with no graphs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the named graph, creating it with `default_ttl_secs` if needed.
    ///
    /// Lookup and insertion happen in one critical section.
    pub fn graph(&self, name: &str, default_ttl_secs: i64) -> Arc<GraphRegistry> {
        let mut graphs = self.graphs.lock();
        if let Some(graph) = graphs.get(name) {
            return Arc::clone(graph);
        }
        let graph = Arc::new(GraphRegistry::new(default_ttl_secs));
        graphs.insert(name.to_owned(), Arc::clone(&graph));
        graph
    }

    /// Returns the named graph if it exists.
    pub fn get_graph(&self, name: &str) -> Option<Arc<GraphRegistry>> {
        self.graphs.lock().get(name).cloned()
    }

    /// Graph names, sorted.
    pub fn graph_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.graphs.lock().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Locks the graph map for a walk over every graph of this host.
    pub(crate) fn lock_graphs(&self) -> MutexGuard<'_, HashMap<String, Arc<GraphRegistry>>> {
        self.graphs.lock()
    }
}
