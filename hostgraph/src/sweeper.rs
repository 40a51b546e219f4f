//! Background expiry sweeper.
//!
//! A [`Sweeper`] owns one OS thread that calls [`Store::sweep`] every
//! [`StoreConfig::sweep_interval`](crate::StoreConfig::sweep_interval).
//! It runs until [`Sweeper::shutdown`] is called or the `Sweeper` is
//! dropped.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hostgraph::{Store, StoreConfig, Sweeper};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(Store::new(StoreConfig::default())?);
//! let sweeper = Sweeper::spawn(Arc::clone(&store))?;
//!
//! store.push_now("web1", "cpu", "user", 12.5);
//!
//! sweeper.shutdown();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Result, SweepError};
use crate::store::Store;

/// Name given to the sweeper thread.
const THREAD_NAME: &str = "hostgraph-sweeper";

/// Handle to the running sweeper thread.
#[derive(Debug)]
pub struct Sweeper {
    /// Dropping the sender wakes and stops the thread.
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Starts sweeping `store` on its configured interval.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Spawn`] if the thread cannot be created.
    pub fn spawn(store: Arc<Store>) -> Result<Self> {
        let interval = store.config().sweep_interval;
        let (stop, stop_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || sweep_loop(&store, &stop_rx, interval))
            .map_err(|source| SweepError::Spawn { source })?;

        tracing::info!(?interval, "sweeper started");

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Stops the thread and waits for the current sweep to finish.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        drop(self.stop.take());

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("sweeper thread panicked");
            } else {
                tracing::info!("sweeper stopped");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Sweeps once per `interval` until the stop channel disconnects.
fn sweep_loop(store: &Store, stop: &mpsc::Receiver<()>, interval: Duration) {
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }

        let report = store.sweep();

        if report.samples_removed > 0 {
            tracing::debug!(
                removed = report.samples_removed,
                graphs = report.graphs_swept,
                "expired samples"
            );
        }
        if report.failed_graphs > 0 {
            tracing::warn!(failed = report.failed_graphs, "sweep skipped graphs");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::StoreConfig;
    use std::time::Instant;

    fn fast_store(now: i64) -> (Arc<Store>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(now));
        let config = StoreConfig {
            default_ttl_secs: 10,
            sweep_interval: Duration::from_millis(10),
        };
        let store = Arc::new(Store::with_clock(config, clock.clone()).unwrap());
        (store, clock)
    }

    /// Polls `cond` until it holds or two seconds pass.
    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_sweeper_expires_in_background() {
        let (store, clock) = fast_store(100);
        store.push("h", "g", "f", 1.0, 95);
        store.push("h", "g", "f", 2.0, 100);

        let sweeper = Sweeper::spawn(Arc::clone(&store)).unwrap();

        clock.set(108);
        assert!(wait_for(|| store.stats().samples == 1));

        clock.set(200);
        assert!(wait_for(|| store.stats().samples == 0));

        sweeper.shutdown();
    }

    #[test]
    fn test_shutdown_stops_sweeping() {
        let (store, clock) = fast_store(100);
        let sweeper = Sweeper::spawn(Arc::clone(&store)).unwrap();
        sweeper.shutdown();

        store.push("h", "g", "f", 1.0, 50);
        clock.set(1_000);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(store.stats().samples, 1);
    }

    #[test]
    fn test_drop_stops_thread() {
        let (store, _) = fast_store(100);
        {
            let _sweeper = Sweeper::spawn(Arc::clone(&store)).unwrap();
        }
        // The thread held the only other reference.
        assert!(wait_for(|| Arc::strong_count(&store) == 1));
    }
}
