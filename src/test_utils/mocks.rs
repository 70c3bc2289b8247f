//! Mock implementations for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{
    AppError, ChainClient, ChainError, ChainTxStatus, StateStore, StoreError, TransferRequest,
};
use crate::infra::MemoryStateStore;

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub should_fail: bool,
    pub error_message: Option<String>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
        }
    }
}

/// Mock chain client for testing.
///
/// Records broadcast order, hands out sequential `0xhashN` transaction
/// hashes, and answers status queries from a scripted response queue
/// (an exhausted script keeps answering "not yet available").
pub struct MockChainClient {
    broadcasts: Mutex<Vec<TransferRequest>>,
    status_responses: Mutex<VecDeque<Option<ChainTxStatus>>>,
    status_calls: AtomicU32,
    config: MockConfig,
    is_healthy: AtomicBool,
}

impl MockChainClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            broadcasts: Mutex::new(Vec::new()),
            status_responses: Mutex::new(VecDeque::new()),
            status_calls: AtomicU32::new(0),
            config,
            is_healthy: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::failure(message))
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    /// Queue the answer for the next status query
    pub fn push_status_response(&self, response: Option<ChainTxStatus>) {
        self.status_responses.lock().unwrap().push_back(response);
    }

    /// Broadcasts seen so far, in dispatch order
    pub fn sent_transfers(&self) -> Vec<TransferRequest> {
        self.broadcasts.lock().unwrap().clone()
    }

    pub fn status_call_count(&self) -> u32 {
        self.status_calls.load(Ordering::Relaxed)
    }

    fn check_should_fail(&self) -> Result<(), AppError> {
        if self.config.should_fail {
            let msg = self
                .config
                .error_message
                .clone()
                .unwrap_or_else(|| "Mock error".to_string());
            return Err(AppError::Chain(ChainError::Broadcast(msg)));
        }
        Ok(())
    }
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn health_check(&self) -> Result<(), AppError> {
        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(AppError::Chain(ChainError::Connection(
                "Unhealthy".to_string(),
            )));
        }
        self.check_should_fail()
    }

    async fn send_transfer(&self, request: &TransferRequest) -> Result<String, AppError> {
        self.check_should_fail()?;
        let mut broadcasts = self.broadcasts.lock().unwrap();
        broadcasts.push(request.clone());
        Ok(format!("0xhash{}", broadcasts.len()))
    }

    async fn transaction_status(&self, _tx_hash: &str) -> Result<Option<ChainTxStatus>, AppError> {
        self.status_calls.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail()?;
        Ok(self
            .status_responses
            .lock()
            .unwrap()
            .pop_front()
            .flatten())
    }

    async fn latest_block_number(&self) -> Result<u64, AppError> {
        self.check_should_fail()?;
        Ok(1_234_567)
    }
}

/// State store whose queue operations can be failed on demand, for
/// exercising the queue-unavailable and self-healing paths.
pub struct FlakyStateStore {
    inner: MemoryStateStore,
    push_failures: AtomicBool,
    pop_failures: AtomicBool,
}

impl FlakyStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: MemoryStateStore::new(),
            push_failures: AtomicBool::new(false),
            pop_failures: AtomicBool::new(false),
        }
    }

    pub fn fail_pushes(&self, fail: bool) {
        self.push_failures.store(fail, Ordering::Relaxed);
    }

    pub fn fail_pops(&self, fail: bool) {
        self.pop_failures.store(fail, Ordering::Relaxed);
    }
}

impl Default for FlakyStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for FlakyStateStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.inner.health_check().await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        self.inner.set(key, value, ttl).await
    }

    async fn queue_push(&self, queue: &str, payload: &str) -> Result<(), AppError> {
        if self.push_failures.load(Ordering::Relaxed) {
            return Err(AppError::Store(StoreError::Connection(
                "queue transport down".to_string(),
            )));
        }
        self.inner.queue_push(queue, payload).await
    }

    async fn queue_pop(&self, queue: &str) -> Result<String, AppError> {
        if self.pop_failures.load(Ordering::Relaxed) {
            return Err(AppError::Store(StoreError::Connection(
                "queue transport down".to_string(),
            )));
        }
        self.inner.queue_pop(queue).await
    }

    async fn queue_len(&self, queue: &str) -> Result<u64, AppError> {
        self.inner.queue_len(queue).await
    }
}
