//! Samples and the ordered per-field sample sequence.
//!
//! A [`FieldSeries`] holds the samples of one (host, graph, field) triple in
//! ascending timestamp order. The workload is append-mostly: collectors push
//! "now" on every tick, so new samples almost always belong at the tail.
//! Both insertion and windowed reads therefore scan from the back.
//!
//! # Layout
//!
//! Samples live in a `VecDeque`, which gives:
//!
//! - O(1) amortized append at the tail
//! - backward scans without extra bookkeeping
//! - O(k) removal of a k-sample expired prefix from the front
//!
//! Mid-sequence insertion of a late sample costs O(n) in the worst case.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One (timestamp, value) observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// The observed value.
    pub value: f64,
}

impl Sample {
    /// Creates a new sample.
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Ascending sequence of samples for a single field.
///
/// A series is never shared on its own: it lives inside its graph's locked
/// state, so every access is serialized by the graph lock and sees the
/// graph's TTL.
#[derive(Debug, Clone, Default)]
pub struct FieldSeries {
    samples: VecDeque<Sample>,
}

impl FieldSeries {
    /// Creates an empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a sample at its ordered position.
    ///
    /// Scans backward from the tail for the newest sample whose timestamp is
    /// strictly less than `sample.timestamp` and inserts right after it.
    /// Appending to the tail is O(1); backfill is O(n).
    ///
    /// # Insertion policy
    ///
    /// A sample is never placed at the front of a non-empty series. If its
    /// timestamp is less than or equal to every timestamp already stored, it
    /// is dropped and `false` is returned with the series left untouched.
    /// An empty series accepts anything.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hostgraph::{FieldSeries, Sample};
    ///
    /// let mut series = FieldSeries::new();
    /// assert!(series.push(Sample::new(10, 1.0)));
    /// assert!(series.push(Sample::new(30, 3.0)));
    /// assert!(series.push(Sample::new(20, 2.0)));
    /// assert!(!series.push(Sample::new(5, 0.5)));
    ///
    /// let timestamps: Vec<i64> = series.iter().map(|s| s.timestamp).collect();
    /// assert_eq!(timestamps, vec![10, 20, 30]);
    /// ```
    pub fn push(&mut self, sample: Sample) -> bool {
        if self.samples.is_empty() {
            self.samples.push_back(sample);
            return true;
        }

        let Some(index) = self
            .samples
            .iter()
            .rposition(|s| s.timestamp < sample.timestamp)
        else {
            return false;
        };

        self.samples.insert(index + 1, sample);
        debug_assert!(self.is_ordered(), "field series out of order after push");
        true
    }

    /// Removes every sample with `timestamp < cutoff` from the front.
    ///
    /// Returns the number of samples removed.
    pub fn remove_prefix(&mut self, cutoff: i64) -> usize {
        let stale = self
            .samples
            .iter()
            .take_while(|s| s.timestamp < cutoff)
            .count();
        self.samples.drain(..stale);
        stale
    }

    /// Returns the samples with `timestamp >= since`, ascending.
    ///
    /// `since == 0` returns the whole series. Otherwise the boundary is
    /// found by scanning backward from the tail, which is cheap for the
    /// common "last few seconds" window.
    pub fn since(&self, since: i64) -> Vec<Sample> {
        if since == 0 {
            return self.to_vec();
        }

        let start = self
            .samples
            .iter()
            .rposition(|s| s.timestamp < since)
            .map_or(0, |i| i + 1);

        self.samples.range(start..).copied().collect()
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The oldest sample.
    pub fn first(&self) -> Option<&Sample> {
        self.samples.front()
    }

    /// The newest sample.
    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Iterates samples oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> + ExactSizeIterator {
        self.samples.iter()
    }

    /// Copies all samples out, oldest first.
    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    fn is_ordered(&self) -> bool {
        self.samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .all(|(a, b)| a.timestamp <= b.timestamp)
    }
}
