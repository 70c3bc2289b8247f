//! In-memory state store implementation.
//!
//! Backs the [`StateStore`] port for development and tests with the same
//! observable semantics a Redis-style deployment would give the core:
//! per-key TTL, FIFO list queues, and a blocking pop. Expired entries are
//! dropped on first read after their deadline.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Notify;

use crate::domain::{AppError, StateStore};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Thread-safe in-memory key-value store with TTL and FIFO queues
#[derive(Default)]
pub struct MemoryStateStore {
    entries: DashMap<String, Entry>,
    queues: DashMap<String, VecDeque<String>>,
    queue_signal: Notify,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }
        // Deadline passed; remove outside the read guard.
        self.entries.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn queue_push(&self, queue: &str, payload: &str) -> Result<(), AppError> {
        self.queues
            .entry(queue.to_string())
            .or_default()
            .push_back(payload.to_string());
        self.queue_signal.notify_one();
        Ok(())
    }

    async fn queue_pop(&self, queue: &str) -> Result<String, AppError> {
        loop {
            // Arm the wakeup before checking, so a push racing with the
            // check cannot be lost.
            let notified = self.queue_signal.notified();
            if let Some(item) = self
                .queues
                .get_mut(queue)
                .and_then(|mut q| q.pop_front())
            {
                return Ok(item);
            }
            notified.await;
        }
    }

    async fn queue_len(&self, queue: &str) -> Result<u64, AppError> {
        Ok(self.queues.get(queue).map_or(0, |q| q.len() as u64))
    }
}
