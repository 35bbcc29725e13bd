//! Background Expiry Sweeper
//!
//! Keys with a deadline are removed lazily when they are accessed, but a key
//! that is never touched again would stay in memory forever. The sweeper is
//! a Tokio task that periodically walks a database's `expires` map and drops
//! every key whose deadline has passed.
//!
//! ## Adaptive Frequency
//!
//! If a large fraction of the tracked keys turn out to be expired, the
//! sweeper halves its interval (down to `min_interval`). If a sweep finds
//! nothing, it doubles the interval (up to `max_interval`).

use crate::storage::RedisDb;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Base interval between sweeps (default: 100ms)
    pub base_interval: Duration,

    /// Minimum interval between sweeps (default: 10ms)
    pub min_interval: Duration,

    /// Maximum interval between sweeps (default: 1s)
    pub max_interval: Duration,

    /// If this fraction of tracked keys are expired, speed up sweeping
    pub speedup_threshold: f64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,
        }
    }
}

/// Handle to a running sweeper. Dropping it stops the task.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Spawns the sweeper for `db` on the current Tokio runtime.
    pub fn start(db: Arc<RedisDb>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let id = db.id;

        tokio::spawn(sweeper_loop(db, config, shutdown_rx));

        info!(db = id, "Background expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Stops the sweeper. Also called on drop.
    pub fn stop(&self) {
        if self.shutdown_tx.send(true).is_ok() {
            info!("Background expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Computes the next interval from the result of one sweep.
fn next_interval(
    current: Duration,
    tracked: usize,
    expired: u64,
    config: &ExpiryConfig,
) -> Duration {
    if tracked == 0 {
        return current;
    }
    let rate = expired as f64 / tracked as f64;
    if rate > config.speedup_threshold {
        (current / 2).max(config.min_interval)
    } else if expired == 0 {
        (current * 2).min(config.max_interval)
    } else {
        current
    }
}

async fn sweeper_loop(
    db: Arc<RedisDb>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut current_interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(current_interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!(db = db.id, "Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let tracked = db.expires.len();
        let expired = db.remove_expired(Instant::now());
        let next = next_interval(current_interval, tracked, expired, &config);

        if next < current_interval {
            debug!(
                db = db.id,
                expired = expired,
                new_interval_ms = next.as_millis(),
                "High expiry rate, speeding up sweeper"
            );
        } else if next > current_interval {
            trace!(db = db.id, new_interval_ms = next.as_millis(), "Slowing down sweeper");
        }
        current_interval = next;

        if expired > 0 {
            debug!(
                db = db.id,
                expired = expired,
                keys_remaining = db.len(),
                "Expired keys cleaned up"
            );
        }
    }
}

/// Starts a sweeper with default configuration.
pub fn start_expiry_sweeper(db: Arc<RedisDb>) -> ExpirySweeper {
    ExpirySweeper::start(db, ExpiryConfig::default())
}
