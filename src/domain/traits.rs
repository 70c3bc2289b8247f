//! Domain traits defining contracts for external systems.

use std::time::Duration;

use async_trait::async_trait;

use super::error::AppError;
use super::types::{ChainTxStatus, TransferRequest};

/// Key-value state store with per-key expiration and FIFO work queues.
///
/// Each key is owned, for writes, by exactly one logical actor: the gateway
/// owns idempotency records, the dispatch worker owns a task's status and
/// hash up to `sent`, and the task's own poller owns the status from `sent`
/// onward. That single-writer discipline is the concurrency-safety mechanism
/// here; the store itself provides no locking.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Check store connectivity
    async fn health_check(&self) -> Result<(), AppError>;

    /// Get a value; `None` for a missing or expired key
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Set a value, replacing any previous one and resetting its TTL
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError>;

    /// Append an item to the tail of a FIFO queue
    async fn queue_push(&self, queue: &str, payload: &str) -> Result<(), AppError>;

    /// Pop the head of a FIFO queue, waiting indefinitely until an item
    /// is available
    async fn queue_pop(&self, queue: &str) -> Result<String, AppError>;

    /// Number of items currently waiting in a queue
    async fn queue_len(&self, queue: &str) -> Result<u64, AppError>;
}

/// Chain client for broadcasting transfers and querying finality
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Check chain RPC connectivity
    async fn health_check(&self) -> Result<(), AppError>;

    /// Broadcast a transfer, returning the transaction hash
    async fn send_transfer(&self, request: &TransferRequest) -> Result<String, AppError>;

    /// Confirmation status for a transaction hash.
    ///
    /// `Ok(None)` means the answer is not yet available and must be
    /// distinguished from a terminal state; `Ok(Some(_))` is authoritative.
    async fn transaction_status(&self, tx_hash: &str) -> Result<Option<ChainTxStatus>, AppError>;

    /// Current chain head
    async fn latest_block_number(&self) -> Result<u64, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal implementations to pin down the object-safe surface.
    struct MinimalStateStore;

    #[async_trait]
    impl StateStore for MinimalStateStore {
        async fn health_check(&self) -> Result<(), AppError> {
            Ok(())
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), AppError> {
            Ok(())
        }

        async fn queue_push(&self, _queue: &str, _payload: &str) -> Result<(), AppError> {
            Ok(())
        }

        async fn queue_pop(&self, _queue: &str) -> Result<String, AppError> {
            Ok(String::new())
        }

        async fn queue_len(&self, _queue: &str) -> Result<u64, AppError> {
            Ok(0)
        }
    }

    struct MinimalChainClient;

    #[async_trait]
    impl ChainClient for MinimalChainClient {
        async fn health_check(&self) -> Result<(), AppError> {
            Ok(())
        }

        async fn send_transfer(&self, _request: &TransferRequest) -> Result<String, AppError> {
            Ok("0xhash".to_string())
        }

        async fn transaction_status(
            &self,
            _tx_hash: &str,
        ) -> Result<Option<ChainTxStatus>, AppError> {
            Ok(None)
        }

        async fn latest_block_number(&self) -> Result<u64, AppError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_traits_are_object_safe() {
        let store: Box<dyn StateStore> = Box::new(MinimalStateStore);
        let chain: Box<dyn ChainClient> = Box::new(MinimalChainClient);

        assert!(store.get("missing").await.unwrap().is_none());
        assert!(chain.transaction_status("0xabc").await.unwrap().is_none());
    }
}
