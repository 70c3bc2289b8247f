//! Background dispatch worker.
//!
//! A single consumer drains the work queue in FIFO order, broadcasts each
//! transfer through the chain client, and hands successfully sent tasks to
//! their confirmation pollers. Serializing the broadcasts through one
//! consumer keeps nonce ordering against the chain intact.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::domain::{ChainClient, StateStore, TaskStatus, WorkItem, keys};

use super::poller::{PollerConfig, poll_confirmation, record_status};

/// Dispatch worker configuration
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Delay before retrying after a dequeue transport error
    pub dequeue_retry_delay: Duration,
    /// Upper bound on concurrently running confirmation pollers
    pub max_concurrent_pollers: usize,
    /// Schedule handed to each confirmation poller
    pub poller: PollerConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dequeue_retry_delay: Duration::from_secs(1),
            max_concurrent_pollers: 512,
            poller: PollerConfig::default(),
        }
    }
}

/// Spawn the dispatch worker.
///
/// Returns the task handle and a shutdown sender; sending `true` (or
/// dropping the sender) stops the worker at its next suspension point and
/// interrupts every running poller's backoff sleep.
pub fn spawn_dispatch_worker(
    store: Arc<dyn StateStore>,
    chain: Arc<dyn ChainClient>,
    config: DispatchConfig,
) -> (JoinHandle<()>, watch::Sender<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(run_dispatch_loop(store, chain, config, shutdown_rx));
    (handle, shutdown_tx)
}

async fn run_dispatch_loop(
    store: Arc<dyn StateStore>,
    chain: Arc<dyn ChainClient>,
    config: DispatchConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Dispatch worker started");
    let pollers = Arc::new(Semaphore::new(config.max_concurrent_pollers));

    loop {
        let payload = tokio::select! {
            _ = shutdown.changed() => break,
            popped = store.queue_pop(keys::TX_QUEUE) => match popped {
                Ok(payload) => payload,
                Err(e) => {
                    // Transient store trouble must not kill the loop.
                    error!(error = %e, "Dequeue failed, retrying");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = sleep(config.dequeue_retry_delay) => {}
                    }
                    continue;
                }
            },
        };

        let item: WorkItem = match serde_json::from_str(&payload) {
            Ok(item) => item,
            Err(e) => {
                // Unrecoverable payload; dropping it is the accepted policy.
                error!(error = %e, "Dropping malformed work item");
                continue;
            }
        };

        record_status(&store, &item.task_id, TaskStatus::Processing).await;

        match chain.send_transfer(&item.request).await {
            Err(e) => {
                warn!(task_id = %item.task_id, error = %e, "Broadcast failed");
                record_status(&store, &item.task_id, TaskStatus::FailedToSend).await;
            }
            Ok(tx_hash) => {
                if let Err(e) = store
                    .set(&keys::task_hash(&item.task_id), &tx_hash, keys::RETENTION_TTL)
                    .await
                {
                    error!(task_id = %item.task_id, error = %e, "Failed to record transaction hash");
                }
                record_status(&store, &item.task_id, TaskStatus::Sent).await;
                info!(task_id = %item.task_id, tx_hash = %tx_hash, "Transfer broadcast");

                let permit = match Arc::clone(&pollers).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let poller_store = Arc::clone(&store);
                let poller_chain = Arc::clone(&chain);
                let poller_config = config.poller.clone();
                let poller_shutdown = shutdown.clone();
                let task_id = item.task_id;
                tokio::spawn(async move {
                    let _permit = permit;
                    poll_confirmation(
                        poller_store,
                        poller_chain,
                        task_id,
                        tx_hash,
                        poller_config,
                        poller_shutdown,
                    )
                    .await;
                });
            }
        }
    }

    info!("Dispatch worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChainTxStatus, TransferRequest};
    use crate::infra::store::MemoryStateStore;
    use crate::test_utils::{FlakyStateStore, MockChainClient};
    use std::str::FromStr;

    fn fast_config() -> DispatchConfig {
        DispatchConfig {
            dequeue_retry_delay: Duration::from_millis(5),
            max_concurrent_pollers: 8,
            poller: PollerConfig {
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(4),
                max_attempts: 5,
            },
        }
    }

    fn enqueue_item(task_id: &str, to: &str) -> String {
        serde_json::to_string(&WorkItem {
            task_id: task_id.to_string(),
            request: TransferRequest::new(to, "100"),
        })
        .unwrap()
    }

    async fn wait_for_status(
        store: &Arc<MemoryStateStore>,
        task_id: &str,
        expected: TaskStatus,
    ) -> bool {
        for _ in 0..200 {
            if let Some(raw) = store.get(&keys::task_status(task_id)).await.unwrap() {
                if TaskStatus::from_str(&raw).unwrap() == expected {
                    return true;
                }
            }
            sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_successful_broadcast_records_hash_and_sent_status() {
        let store = Arc::new(MemoryStateStore::new());
        let chain = Arc::new(MockChainClient::new());
        chain.push_status_response(Some(ChainTxStatus::Confirmed));

        store
            .queue_push(keys::TX_QUEUE, &enqueue_item("t1", "0xabc"))
            .await
            .unwrap();

        let (handle, shutdown) =
            spawn_dispatch_worker(store.clone(), chain.clone(), fast_config());

        // Sent, then the poller drives it to confirmed.
        assert!(wait_for_status(&store, "t1", TaskStatus::Confirmed).await);
        let hash = store.get(&keys::task_hash("t1")).await.unwrap();
        assert_eq!(hash.as_deref(), Some("0xhash1"));

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_broadcast_failure_is_terminal_without_poller() {
        let store = Arc::new(MemoryStateStore::new());
        let chain = Arc::new(MockChainClient::failing("insufficient funds"));

        store
            .queue_push(keys::TX_QUEUE, &enqueue_item("t1", "0xabc"))
            .await
            .unwrap();

        let (handle, shutdown) =
            spawn_dispatch_worker(store.clone(), chain.clone(), fast_config());

        assert!(wait_for_status(&store, "t1", TaskStatus::FailedToSend).await);
        assert!(store.get(&keys::task_hash("t1")).await.unwrap().is_none());
        assert_eq!(chain.status_call_count(), 0);

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_items_are_dispatched_in_fifo_order() {
        let store = Arc::new(MemoryStateStore::new());
        let chain = Arc::new(MockChainClient::new());

        for (task, to) in [("a", "0xa"), ("b", "0xb"), ("c", "0xc")] {
            store
                .queue_push(keys::TX_QUEUE, &enqueue_item(task, to))
                .await
                .unwrap();
        }

        let (handle, shutdown) =
            spawn_dispatch_worker(store.clone(), chain.clone(), fast_config());

        assert!(wait_for_status(&store, "c", TaskStatus::Pending).await);
        let order: Vec<String> = chain
            .sent_transfers()
            .into_iter()
            .map(|r| r.to)
            .collect();
        assert_eq!(order, vec!["0xa", "0xb", "0xc"]);

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped_and_loop_continues() {
        let store = Arc::new(MemoryStateStore::new());
        let chain = Arc::new(MockChainClient::new());
        chain.push_status_response(Some(ChainTxStatus::Confirmed));

        store
            .queue_push(keys::TX_QUEUE, "{definitely not json")
            .await
            .unwrap();
        store
            .queue_push(keys::TX_QUEUE, &enqueue_item("t2", "0xdef"))
            .await
            .unwrap();

        let (handle, shutdown) =
            spawn_dispatch_worker(store.clone(), chain.clone(), fast_config());

        // The bad item vanishes; the good one still gets processed.
        assert!(wait_for_status(&store, "t2", TaskStatus::Confirmed).await);
        assert_eq!(chain.sent_transfers().len(), 1);

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_worker_self_heals_after_dequeue_errors() {
        let store = Arc::new(FlakyStateStore::new());
        let chain = Arc::new(MockChainClient::new());
        chain.push_status_response(Some(ChainTxStatus::Confirmed));

        store.fail_pops(true);
        store
            .queue_push(keys::TX_QUEUE, &enqueue_item("t1", "0xabc"))
            .await
            .unwrap();

        let (handle, shutdown) =
            spawn_dispatch_worker(store.clone(), chain.clone(), fast_config());

        // Let the worker hit a few failed pops, then recover the transport.
        sleep(Duration::from_millis(25)).await;
        assert!(chain.sent_transfers().is_empty());
        store.fail_pops(false);

        for _ in 0..200 {
            if chain.sent_transfers().len() == 1 {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(chain.sent_transfers().len(), 1);

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_an_idle_worker() {
        let store = Arc::new(MemoryStateStore::new());
        let chain = Arc::new(MockChainClient::new());

        let (handle, shutdown) = spawn_dispatch_worker(store, chain, fast_config());
        shutdown.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker should stop promptly")
            .unwrap();
    }
}
