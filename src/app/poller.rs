//! Per-transaction confirmation poller.
//!
//! One poller runs for every successfully broadcast transfer. It queries the
//! chain with exponential backoff until it gets an authoritative answer or
//! exhausts its attempt budget, then records the terminal status and exits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::domain::{ChainClient, StateStore, TaskStatus, keys};

/// Confirmation polling schedule
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// First sleep between attempts
    pub initial_backoff: Duration,
    /// Backoff doubles after each unsuccessful attempt, bounded by this cap
    pub max_backoff: Duration,
    /// Give up and record `pending` once this many attempts have failed
    pub max_attempts: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            max_attempts: 60,
        }
    }
}

/// The Nth sleep of the schedule: `min(initial * 2^(N-1), max)`.
#[must_use]
pub fn backoff_schedule(config: &PollerConfig, completed_attempts: u32) -> Duration {
    let doubled = config
        .initial_backoff
        .saturating_mul(1u32 << completed_attempts.saturating_sub(1).min(31));
    doubled.min(config.max_backoff)
}

/// Record a task status, logging instead of failing: past the gateway there
/// is no caller left to surface a store error to.
pub(crate) async fn record_status(store: &Arc<dyn StateStore>, task_id: &str, status: TaskStatus) {
    if let Err(e) = store
        .set(&keys::task_status(task_id), status.as_str(), keys::RETENTION_TTL)
        .await
    {
        error!(task_id = %task_id, status = %status, error = %e, "Failed to record task status");
    }
}

/// Poll the chain for one transaction until finality, give-up, or shutdown.
///
/// Writes exactly one terminal status: the mapped chain answer, or `pending`
/// after `max_attempts` unsuccessful queries. Query errors count as
/// unsuccessful attempts; an interrupted shutdown writes nothing.
pub async fn poll_confirmation(
    store: Arc<dyn StateStore>,
    chain: Arc<dyn ChainClient>,
    task_id: String,
    tx_hash: String,
    config: PollerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;
    let mut backoff = config.initial_backoff;

    loop {
        attempt += 1;

        match chain.transaction_status(&tx_hash).await {
            Ok(Some(status)) => {
                info!(task_id = %task_id, tx_hash = %tx_hash, status = %status, attempt, "Transaction reached finality");
                record_status(&store, &task_id, TaskStatus::from(status)).await;
                return;
            }
            Ok(None) => {
                debug!(task_id = %task_id, tx_hash = %tx_hash, attempt, "Confirmation not yet available");
            }
            Err(e) => {
                debug!(task_id = %task_id, tx_hash = %tx_hash, attempt, error = %e, "Confirmation query failed");
            }
        }

        if attempt >= config.max_attempts {
            info!(task_id = %task_id, tx_hash = %tx_hash, attempt, "Attempt budget exhausted, giving up as pending");
            record_status(&store, &task_id, TaskStatus::Pending).await;
            return;
        }

        tokio::select! {
            _ = shutdown.changed() => {
                debug!(task_id = %task_id, "Poller stopped by shutdown");
                return;
            }
            _ = sleep(backoff) => {}
        }
        backoff = backoff.saturating_mul(2).min(config.max_backoff);
    }
}
