//! State store key conventions shared by the gateway, worker, poller and
//! read path.
//!
//! Every record carries [`RETENTION_TTL`] from its last write; a task becomes
//! unreachable once its keys expire. An idempotency key may therefore be
//! reused for an unrelated task after the window closes.

use std::time::Duration;

/// Retention window for idempotency records and task state (24 hours)
pub const RETENTION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// FIFO work queue of serialized [`WorkItem`](super::WorkItem)s
pub const TX_QUEUE: &str = "tx:queue";

/// Idempotency-key-to-task-id mapping
#[must_use]
pub fn idempotency(key: &str) -> String {
    format!("idemp:{}", key)
}

/// Task-id-to-status mapping
#[must_use]
pub fn task_status(task_id: &str) -> String {
    format!("task:status:{}", task_id)
}

/// Task-id-to-transaction-hash mapping
#[must_use]
pub fn task_hash(task_id: &str) -> String {
    format!("task:hash:{}", task_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(idempotency("k1"), "idemp:k1");
        assert_eq!(task_status("t1"), "task:status:t1");
        assert_eq!(task_hash("t1"), "task:hash:t1");
    }

    #[test]
    fn test_retention_window_is_24_hours() {
        assert_eq!(RETENTION_TTL, Duration::from_secs(86_400));
    }
}
