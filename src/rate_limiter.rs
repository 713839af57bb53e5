//! Quota-aware pacing for Gmail API calls
//!
//! Gmail charges every call against a per-user budget of quota units:
//! - messages.list: 5 units
//! - messages.get: 5 units
//! - messages.trash: 5 units
//! - messages.delete: 10 units
//!
//! The default budget is 250 units per user per second. The purge loop is
//! sequential, so the bucket only ever delays the next call; it never admits
//! two calls at once.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::QuotaConfig;

/// Quota cost of each remote operation the purge pipeline issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaCost {
    List,
    Get,
    Trash,
    Delete,
}

impl QuotaCost {
    pub fn units(&self) -> u32 {
        match self {
            QuotaCost::List | QuotaCost::Get | QuotaCost::Trash => 5,
            QuotaCost::Delete => 10,
        }
    }
}

/// Token bucket holding quota units
#[derive(Debug, Clone)]
pub struct QuotaRateLimiter {
    inner: Arc<Mutex<BucketState>>,
}

#[derive(Debug)]
struct BucketState {
    available_units: f64,
    max_units: f64,
    refill_rate: f64,
    last_refill: Instant,
    total_consumed: u64,
    total_operations: u64,
    total_waited: Duration,
}

impl BucketState {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.available_units = (self.available_units + elapsed * self.refill_rate).min(self.max_units);
        self.last_refill = now;
    }
}

impl QuotaRateLimiter {
    /// Gmail's default per-user limits: 250 units/s, two seconds of burst
    pub fn new() -> Self {
        Self::with_config(250.0, 500.0)
    }

    pub fn from_config(config: &QuotaConfig) -> Self {
        Self::with_config(config.units_per_second as f64, config.burst_units as f64)
    }

    /// # Arguments
    /// * `refill_rate` - Quota units added per second
    /// * `max_units` - Bucket capacity; the bucket starts full
    pub fn with_config(refill_rate: f64, max_units: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BucketState {
                available_units: max_units,
                max_units,
                refill_rate,
                last_refill: Instant::now(),
                total_consumed: 0,
                total_operations: 0,
                total_waited: Duration::ZERO,
            })),
        }
    }

    /// Take the units for one call, sleeping until the bucket holds enough
    pub async fn acquire(&self, cost: QuotaCost) {
        let units_needed = cost.units() as f64;

        loop {
            let wait_time = {
                let mut state = self.inner.lock().await;
                state.refill();

                trace!(
                    "Quota state: {:.1}/{:.1} units available, requesting {:.0}",
                    state.available_units,
                    state.max_units,
                    units_needed
                );

                if state.available_units >= units_needed {
                    state.available_units -= units_needed;
                    state.total_consumed += units_needed as u64;
                    state.total_operations += 1;
                    return;
                }

                let deficit = units_needed - state.available_units;
                let wait = Duration::from_secs_f64(deficit / state.refill_rate);
                state.total_waited += wait;
                wait
            };

            debug!(
                "Quota exhausted, waiting {:.2}s for {:?} ({} units)",
                wait_time.as_secs_f64(),
                cost,
                units_needed
            );
            tokio::time::sleep(wait_time).await;
        }
    }

    pub async fn stats(&self) -> QuotaStats {
        let state = self.inner.lock().await;
        QuotaStats {
            total_consumed: state.total_consumed,
            total_operations: state.total_operations,
            total_waited: state.total_waited,
        }
    }
}

impl Default for QuotaRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Usage counters since the limiter was created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaStats {
    pub total_consumed: u64,
    pub total_operations: u64,
    pub total_waited: Duration,
}
