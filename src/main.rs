//! shardkv load driver
//!
//! Builds a set of databases from the command line configuration, starts an
//! expiry sweeper for each, and hammers them from several OS threads with a
//! mix of string writes, reads, expiries and sorted-set updates. Prints what
//! the maps saw when it is done.

use anyhow::{bail, Context};
use bytes::Bytes;
use shardkv::{start_expiry_sweeper, Config, RedisDb};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Driver options on top of the storage configuration.
struct Options {
    config: Config,
    threads: usize,
    ops: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config: Config::default(),
            threads: 4,
            ops: 100_000,
        }
    }
}

impl Options {
    /// Parse options from command-line arguments
    fn from_args() -> anyhow::Result<Option<Self>> {
        let mut options = Options::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            let value = || {
                args.get(i + 1)
                    .with_context(|| format!("{} requires a value", args[i]))
            };
            match args[i].as_str() {
                "--shards" | "-s" => {
                    options.config.shard_num = value()?.parse().context("invalid shard count")?;
                    i += 2;
                }
                "--databases" | "-d" => {
                    options.config.databases = value()?.parse().context("invalid database count")?;
                    i += 2;
                }
                "--threads" | "-t" => {
                    options.threads = value()?.parse().context("invalid thread count")?;
                    i += 2;
                }
                "--ops" | "-n" => {
                    options.ops = value()?.parse().context("invalid operation count")?;
                    i += 2;
                }
                "--help" | "-h" => {
                    print_help();
                    return Ok(None);
                }
                "--version" | "-v" => {
                    println!("shardkv version {}", shardkv::VERSION);
                    return Ok(None);
                }
                other => {
                    print_help();
                    bail!("unknown argument: {}", other);
                }
            }
        }

        if options.threads == 0 || options.config.databases == 0 {
            bail!("--threads and --databases must be at least 1");
        }
        Ok(Some(options))
    }
}

fn print_help() {
    println!(
        r#"
shardkv - sharded dictionary and skip list load driver

USAGE:
    shardkv [OPTIONS]

OPTIONS:
    -s, --shards <N>       Shards per dictionary, 16..=2048 (default: 128)
    -d, --databases <N>    Number of databases (default: 16)
    -t, --threads <N>      Worker threads (default: 4)
    -n, --ops <N>          Operations per thread (default: 100000)
    -v, --version          Print version information
    -h, --help             Print this help message

Set RUST_LOG=debug to see sweeper and dictionary events.
"#
    );
}

/// One worker: a mix of 60% writes, 20% reads, 10% expiries, 10% zadds.
///
/// Returns the number of operations that failed.
fn run_worker(dbs: &[Arc<RedisDb>], worker: usize, ops: usize) -> u64 {
    let mut failed = 0;
    for i in 0..ops {
        let db = &dbs[i % dbs.len()];
        let key = format!("key:{}:{}", worker, i % 10_000);
        let result = match i % 10 {
            0..=5 => {
                db.set_string(&key, Bytes::from("value"));
                Ok(())
            }
            6 | 7 => db.get_string(&key).map(drop),
            8 => {
                db.set_expire(&key, Duration::from_millis(50));
                Ok(())
            }
            _ => db
                .zadd(
                    &format!("board:{}", worker),
                    &format!("member:{}", i % 1_000),
                    i as f64,
                )
                .map(drop),
        };
        if let Err(e) = result {
            warn!(worker, db = db.id, key = %key, error = %e, "Operation failed");
            failed += 1;
        }
    }
    failed
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(options) = Options::from_args()? else {
        return Ok(());
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::INFO.into()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to install logger")?;

    let config = &options.config;
    let dbs: Vec<Arc<RedisDb>> = (0..config.databases)
        .map(|id| Arc::new(RedisDb::new(id, config)))
        .collect();
    info!(
        databases = dbs.len(),
        shards = config.shard_count(),
        "Databases initialized"
    );

    let sweepers: Vec<_> = dbs.iter().map(|db| start_expiry_sweeper(Arc::clone(db))).collect();

    let started = Instant::now();
    let handles: Vec<_> = (0..options.threads)
        .map(|worker| {
            let dbs = dbs.clone();
            let ops = options.ops;
            thread::spawn(move || run_worker(&dbs, worker, ops))
        })
        .collect();

    let joined = tokio::task::spawn_blocking(move || {
        handles.into_iter().map(|h| h.join()).collect::<Result<Vec<_>, _>>()
    })
    .await
    .context("worker join task failed")?;
    let Ok(failures) = joined else {
        bail!("a worker thread panicked");
    };
    let elapsed = started.elapsed();

    let total_ops = options.threads * options.ops;
    info!(
        ops = total_ops,
        failed = failures.iter().sum::<u64>(),
        elapsed_ms = elapsed.as_millis(),
        ops_per_sec = (total_ops as f64 / elapsed.as_secs_f64()) as u64,
        "Workload finished"
    );

    // Give the sweepers one round to catch the last expiries.
    tokio::time::sleep(Duration::from_millis(200)).await;
    drop(sweepers);

    for db in &dbs {
        let stats = db.table.stats();
        info!(
            db = db.id,
            keys = db.len(),
            expiring = db.expires.len(),
            reads = stats.reads,
            writes = stats.writes,
            deletes = stats.deletes,
            "Database summary"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_counts_failed_operations() {
        let db = Arc::new(RedisDb::new(0, &Config::default()));
        assert_eq!(run_worker(&[Arc::clone(&db)], 0, 20), 0);

        // A string under the worker's sorted-set key makes every zadd fail.
        db.set_string("board:1", Bytes::from("taken"));
        assert_eq!(run_worker(&[Arc::clone(&db)], 1, 20), 2);
    }
}
