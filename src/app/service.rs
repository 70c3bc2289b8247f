//! Application service layer: submission gateway and read paths.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    AppError, ChainClient, ChainTxStatus, HealthResponse, HealthStatus, StateStore, StoreError,
    SystemStatus, TaskStatus, TaskStatusView, TaskTicket, TransferRequest, ValidationError,
    WorkItem, keys,
};

/// Application service containing the submission gateway and the read paths.
///
/// Writes only ever touch the idempotency record and the work queue; task
/// status and hash keys belong to the dispatch worker and the pollers.
pub struct RelayerService {
    store: Arc<dyn StateStore>,
    chain: Arc<dyn ChainClient>,
}

impl RelayerService {
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>, chain: Arc<dyn ChainClient>) -> Self {
        Self { store, chain }
    }

    /// Accept a transfer for background dispatch.
    ///
    /// A previously seen idempotency key replays the original task id with
    /// `accepted = false` and enqueues nothing. A fresh key gets a new
    /// time-ordered task id, one queue item, and an idempotency record with
    /// the retention TTL. Validation failures produce no side effect.
    #[instrument(skip(self, request), fields(to = %request.to))]
    pub async fn submit_transfer(
        &self,
        idempotency_key: &str,
        request: &TransferRequest,
    ) -> Result<TaskTicket, AppError> {
        if idempotency_key.is_empty() {
            return Err(AppError::Validation(
                ValidationError::MissingIdempotencyKey,
            ));
        }

        request.validate().map_err(|e| {
            warn!(error = %e, "Validation failed");
            AppError::Validation(ValidationError::Multiple(e.to_string()))
        })?;

        // Replay: the work was already accepted under this key.
        if let Some(existing) = self.store.get(&keys::idempotency(idempotency_key)).await? {
            info!(task_id = %existing, "Duplicate submission, replaying existing task");
            return Ok(TaskTicket {
                task_id: existing,
                accepted: false,
            });
        }

        let task_id = Uuid::now_v7().to_string();
        let item = WorkItem {
            task_id: task_id.clone(),
            request: request.clone(),
        };
        let payload =
            serde_json::to_string(&item).map_err(|e| AppError::Serialization(e.to_string()))?;

        // Enqueue before recording the key: a failed push must leave no
        // idempotency record behind, so the caller can retry safely.
        self.store
            .queue_push(keys::TX_QUEUE, &payload)
            .await
            .map_err(|e| AppError::QueueUnavailable(e.to_string()))?;

        // Best effort from here on: the item is already queued, so a failed
        // record write must not retract the acceptance. The duplicate-task
        // window this opens is the documented trade-off.
        if let Err(e) = self
            .store
            .set(&keys::idempotency(idempotency_key), &task_id, keys::RETENTION_TTL)
            .await
        {
            warn!(task_id = %task_id, error = %e, "Failed to write idempotency record");
        }

        info!(task_id = %task_id, "Transfer accepted and enqueued");

        Ok(TaskTicket {
            task_id,
            accepted: true,
        })
    }

    /// Current view of a task. Missing keys are not an error: an empty view
    /// means the task is not yet processed, or expired.
    #[instrument(skip(self))]
    pub async fn task_status(&self, task_id: &str) -> Result<TaskStatusView, AppError> {
        let tx_hash = self.store.get(&keys::task_hash(task_id)).await?;
        let status = match self.store.get(&keys::task_status(task_id)).await? {
            Some(raw) => Some(TaskStatus::from_str(&raw).map_err(|_| {
                AppError::Store(StoreError::Corrupted(format!(
                    "unparseable status for task {}: {}",
                    task_id, raw
                )))
            })?),
            None => None,
        };

        Ok(TaskStatusView {
            task_id: task_id.to_string(),
            tx_hash,
            status,
        })
    }

    /// Chain-side confirmation status for a known transaction hash.
    ///
    /// Bypasses the task abstraction entirely and delegates to the chain
    /// client; `None` means no authoritative answer yet.
    #[instrument(skip(self))]
    pub async fn tx_status_by_hash(
        &self,
        tx_hash: &str,
    ) -> Result<Option<ChainTxStatus>, AppError> {
        self.chain.transaction_status(tx_hash).await
    }

    /// Perform health check on all dependencies
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthResponse {
        let store_health = match self.store.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Unhealthy,
        };
        let chain_health = match self.chain.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Unhealthy,
        };
        HealthResponse::new(store_health, chain_health)
    }

    /// Aggregate system status: store reachability, queue depth, chain head
    #[instrument(skip(self))]
    pub async fn system_status(&self) -> SystemStatus {
        let store = match self.store.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Unhealthy,
        };
        let queue_depth = self.store.queue_len(keys::TX_QUEUE).await.unwrap_or(0);
        let (latest_block, chain_error) = match self.chain.latest_block_number().await {
            Ok(n) => (Some(n), None),
            Err(e) => (None, Some(e.to_string())),
        };

        SystemStatus {
            store,
            queue_depth,
            latest_block,
            chain_error,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::store::MemoryStateStore;
    use crate::test_utils::{FlakyStateStore, MockChainClient};

    fn service_with(
        store: Arc<dyn StateStore>,
        chain: Arc<dyn ChainClient>,
    ) -> RelayerService {
        RelayerService::new(store, chain)
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_idempotency_key() {
        let store = Arc::new(MemoryStateStore::new());
        let service = service_with(store.clone(), Arc::new(MockChainClient::new()));

        let result = service
            .submit_transfer("", &TransferRequest::new("0xabc", "100"))
            .await;

        assert!(matches!(
            result,
            Err(AppError::Validation(ValidationError::MissingIdempotencyKey))
        ));
        assert_eq!(store.queue_len(keys::TX_QUEUE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_request_without_side_effects() {
        let store = Arc::new(MemoryStateStore::new());
        let service = service_with(store.clone(), Arc::new(MockChainClient::new()));

        let result = service
            .submit_transfer("k1", &TransferRequest::new("", "100"))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.queue_len(keys::TX_QUEUE).await.unwrap(), 0);
        assert!(store.get(&keys::idempotency("k1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_submit_is_idempotent_per_key() {
        let store = Arc::new(MemoryStateStore::new());
        let service = service_with(store.clone(), Arc::new(MockChainClient::new()));
        let request = TransferRequest::new("0xabc", "100");

        let first = service.submit_transfer("k1", &request).await.unwrap();
        assert!(first.accepted);

        let second = service.submit_transfer("k1", &request).await.unwrap();
        assert!(!second.accepted);
        assert_eq!(second.task_id, first.task_id);

        // Exactly one queue item despite two submissions.
        assert_eq!(store.queue_len(keys::TX_QUEUE).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_create_distinct_tasks() {
        let store = Arc::new(MemoryStateStore::new());
        let service = service_with(store.clone(), Arc::new(MockChainClient::new()));
        let request = TransferRequest::new("0xabc", "100");

        let t1 = service.submit_transfer("k1", &request).await.unwrap();
        let t2 = service.submit_transfer("k2", &request).await.unwrap();

        assert_ne!(t1.task_id, t2.task_id);
        assert_eq!(store.queue_len(keys::TX_QUEUE).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_queue_failure_leaves_no_idempotency_record() {
        let store = Arc::new(FlakyStateStore::new());
        store.fail_pushes(true);
        let service = service_with(store.clone(), Arc::new(MockChainClient::new()));

        let result = service
            .submit_transfer("k1", &TransferRequest::new("0xabc", "100"))
            .await;
        assert!(matches!(result, Err(AppError::QueueUnavailable(_))));

        // A retry after the queue recovers must create the task.
        store.fail_pushes(false);
        let ticket = service
            .submit_transfer("k1", &TransferRequest::new("0xabc", "100"))
            .await
            .unwrap();
        assert!(ticket.accepted);
    }

    #[tokio::test]
    async fn test_task_status_tolerates_unknown_task() {
        let service = service_with(
            Arc::new(MemoryStateStore::new()),
            Arc::new(MockChainClient::new()),
        );

        let view = service.task_status("nope").await.unwrap();
        assert_eq!(view.task_id, "nope");
        assert!(view.tx_hash.is_none());
        assert!(view.status.is_none());
    }

    #[tokio::test]
    async fn test_task_status_rejects_corrupted_status_record() {
        let store = Arc::new(MemoryStateStore::new());
        store
            .set(&keys::task_status("t1"), "what-even", keys::RETENTION_TTL)
            .await
            .unwrap();
        let service = service_with(store, Arc::new(MockChainClient::new()));

        let result = service.task_status("t1").await;
        assert!(matches!(
            result,
            Err(AppError::Store(StoreError::Corrupted(_)))
        ));
    }

    #[tokio::test]
    async fn test_tx_status_by_hash_delegates_to_chain() {
        let chain = Arc::new(MockChainClient::new());
        chain.push_status_response(Some(ChainTxStatus::Confirmed));
        let service = service_with(Arc::new(MemoryStateStore::new()), chain.clone());

        let status = service.tx_status_by_hash("0xhash1").await.unwrap();
        assert_eq!(status, Some(ChainTxStatus::Confirmed));
        assert_eq!(chain.status_call_count(), 1);
    }

    #[tokio::test]
    async fn test_health_check_degrades_with_chain() {
        let chain = Arc::new(MockChainClient::failing("node down"));
        let service = service_with(Arc::new(MemoryStateStore::new()), chain);

        let health = service.health_check().await;
        assert_eq!(health.store, HealthStatus::Healthy);
        assert_eq!(health.chain, HealthStatus::Unhealthy);
        assert_eq!(health.status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_system_status_reports_queue_depth_and_head() {
        let store = Arc::new(MemoryStateStore::new());
        let service = service_with(store.clone(), Arc::new(MockChainClient::new()));

        service
            .submit_transfer("k1", &TransferRequest::new("0xabc", "100"))
            .await
            .unwrap();

        let status = service.system_status().await;
        assert_eq!(status.queue_depth, 1);
        assert!(status.latest_block.is_some());
        assert!(status.chain_error.is_none());
    }
}
