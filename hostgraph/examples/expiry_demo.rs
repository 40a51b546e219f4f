//! Example demonstrating per-graph TTLs and the expiry sweep.
//!
//! This example shows how to:
//! - Push samples for several hosts and graphs
//! - Give one graph a longer TTL than the default
//! - Sweep with a manual clock and watch stale samples disappear

use std::sync::Arc;

use hostgraph::{ManualClock, Store, StoreConfig};

fn main() -> hostgraph::Result<()> {
    println!("hostgraph expiry example");

    let clock = Arc::new(ManualClock::new(1_000));
    let config = StoreConfig {
        default_ttl_secs: 30,
        ..StoreConfig::default()
    };
    let store = Store::with_clock(config, clock.clone())?;

    // One sample every 10 seconds for a minute.
    for step in 0..6i32 {
        clock.set(1_000 + i64::from(step) * 10);
        store.push_now("web1", "cpu", "user", 12.5 + f64::from(step));
        store.push_now("web1", "cpu", "system", 3.0);
        store.push_now("db1", "disk", "used", 70.0);
    }

    // Keep disk history for ten minutes.
    store.set_expire("db1", "disk", 600);

    println!("\nBefore sweep (now={}):", store.now());
    print!("{store}");

    let report = store.sweep();
    println!(
        "\nSwept {} graphs, {} fields, removed {} samples",
        report.graphs_swept, report.fields_swept, report.samples_removed
    );

    println!("\nAfter sweep:");
    print!("{store}");

    let stats = store.stats();
    println!(
        "\n{} hosts, {} graphs, {} fields, {} samples",
        stats.hosts, stats.graphs, stats.fields, stats.samples
    );

    Ok(())
}
