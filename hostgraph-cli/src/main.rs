//! CLI for the hostgraph time-series store.
//!
//! Pushes samples to and reads them back from a running `hostgraph-server`,
//! and benchmarks the in-process push path.

use std::collections::BTreeMap;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use hostgraph::{Sample, Store, StoreConfig};
use reqwest::StatusCode;
use reqwest::blocking::Client;

/// hostgraph: client for the in-memory host/graph time-series store.
#[derive(Parser)]
#[command(name = "hostgraph", version, about)]
struct Cli {
    /// Base URL of the hostgraph server.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Push one sample per field to a graph.
    Push {
        /// Host name (`[0-9a-z.]+`).
        host: String,

        /// Graph name (`[0-9a-z.]+`).
        graph: String,

        /// Field values as `field=value` pairs.
        #[arg(required = true)]
        values: Vec<String>,

        /// Timestamp in seconds (default: server time).
        #[arg(long)]
        ts: Option<i64>,

        /// Set the graph TTL in seconds.
        #[arg(long)]
        expire: Option<i64>,
    },

    /// Fetch the samples of a graph.
    Data {
        /// Host name.
        host: String,

        /// Graph name.
        graph: String,

        /// Only samples at or after this timestamp (0 = everything).
        #[arg(long, default_value = "0")]
        since: i64,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Print the server's diagnostic dump of every host, graph and field.
    Dump,

    /// Run an in-process push-path microbenchmark.
    Bench {
        /// Number of samples to push.
        #[arg(long, default_value = "10000000")]
        points: u64,

        /// Number of fields to spread the samples over.
        #[arg(long, default_value = "30")]
        fields: u32,
    },
}

/// Output format for data results.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Comma-separated values.
    Csv,
    /// JSON object of field to samples.
    Json,
}

fn main() {
    let cli = Cli::parse();
    let url = cli.url.trim_end_matches('/');

    let result = match cli.command {
        Commands::Push {
            host,
            graph,
            values,
            ts,
            expire,
        } => cmd_push(url, &host, &graph, &values, ts, expire),
        Commands::Data {
            host,
            graph,
            since,
            format,
        } => cmd_data(url, &host, &graph, since, &format),
        Commands::Dump => cmd_dump(url),
        Commands::Bench { points, fields } => cmd_bench(points, fields),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Implements `hostgraph push <host> <graph> <field=value>...`.
fn cmd_push(
    url: &str,
    host: &str,
    graph: &str,
    values: &[String],
    ts: Option<i64>,
    expire: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut form = values
        .iter()
        .map(|v| parse_assignment(v))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(ts) = ts {
        form.push(("_ts".to_string(), ts.to_string()));
    }
    if let Some(expire) = expire {
        form.push(("_expire".to_string(), expire.to_string()));
    }

    let response = Client::new()
        .post(format!("{url}/api/update/{host}/{graph}/"))
        .form(&form)
        .send()?;

    if response.status() == StatusCode::NOT_FOUND {
        return Err(format!("Invalid host or graph name: '{host}/{graph}'").into());
    }
    let response = response.error_for_status()?;

    print!("{}", response.text()?);
    Ok(())
}

/// Implements `hostgraph data <host> <graph>`.
fn cmd_data(
    url: &str,
    host: &str,
    graph: &str,
    since: i64,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = Client::new()
        .get(format!("{url}/api/data/{host}/{graph}/{since}/data.json"))
        .send()?;

    if response.status() == StatusCode::NOT_FOUND {
        return Err(format!("Graph '{host}/{graph}' not found").into());
    }
    let body = response.error_for_status()?.text()?;
    let data: BTreeMap<String, Vec<Sample>> = serde_json::from_str(&body)?;

    match format {
        OutputFormat::Csv => {
            let points: usize = data.values().map(Vec::len).sum();
            println!("# host={host}, graph={graph}, fields={}, points={points}", data.len());
            println!("field,timestamp,value");
            for (field, samples) in &data {
                for sample in samples {
                    println!("{field},{},{}", sample.timestamp, sample.value);
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "host": host,
                "graph": graph,
                "since": since,
                "data": data,
            });

            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Implements `hostgraph dump`.
fn cmd_dump(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let body = Client::new()
        .get(format!("{url}/api/dump"))
        .send()?
        .error_for_status()?
        .text()?;

    print!("{body}");
    Ok(())
}

/// Implements `hostgraph bench`.
#[allow(clippy::cast_precision_loss)] // Benchmark stats are fine with f64 precision
fn cmd_bench(points: u64, field_count: u32) -> Result<(), Box<dyn std::error::Error>> {
    if field_count == 0 {
        return Err("--fields must be at least 1".into());
    }

    println!("hostgraph push-path benchmark");
    println!("  Points: {points}");
    println!("  Fields: {field_count}");
    println!();

    let store = Store::new(StoreConfig::default())?;
    let fields: Vec<String> = (0..field_count).map(|i| format!("field{i}")).collect();

    println!("Pushing {points} samples across {field_count} fields...");

    let base_time = 1_700_000_000i64;
    let points_per_field = points / u64::from(field_count);

    let start = Instant::now();

    let mut ts = base_time;
    let mut rejected = 0u64;
    for _ in 0..points_per_field {
        ts += 1;
        for (i, field) in fields.iter().enumerate() {
            if !store.push("bench", "load", field, i as f64, ts) {
                rejected += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    let total_pushes = points_per_field * u64::from(field_count);
    let ns_per_push = elapsed.as_nanos() as f64 / total_pushes.max(1) as f64;
    let pushes_per_sec = total_pushes as f64 / elapsed.as_secs_f64();

    let stats = store.stats();

    println!();
    println!("Results:");
    println!("  Total pushes: {total_pushes}");
    println!("  Rejected: {rejected}");
    println!("  Stored samples: {}", stats.samples);
    println!("  Elapsed: {elapsed:.3?}");
    println!("  Avg latency: {ns_per_push:.1} ns/push");
    println!("  Throughput: {pushes_per_sec:.0} pushes/sec");
    println!();

    Ok(())
}

/// Splits a `field=value` argument, checking that the value is numeric.
fn parse_assignment(arg: &str) -> Result<(String, String), Box<dyn std::error::Error>> {
    let (field, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("Expected field=value, got '{arg}'"))?;

    if field.is_empty() || field.starts_with('_') {
        return Err(format!("Invalid field name: '{field}'").into());
    }
    value
        .parse::<f64>()
        .map_err(|e| format!("Invalid value for '{field}': {e}"))?;

    Ok((field.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("user=12.5").unwrap(),
            ("user".to_string(), "12.5".to_string())
        );
    }

    #[test]
    fn test_parse_assignment_rejects_bad_input() {
        assert!(parse_assignment("user").is_err());
        assert!(parse_assignment("=1").is_err());
        assert!(parse_assignment("_ts=1").is_err());
        assert!(parse_assignment("user=abc").is_err());
    }

    #[test]
    fn test_bench_runs() {
        cmd_bench(100, 4).unwrap();
        assert!(cmd_bench(10, 0).is_err());
    }
}
