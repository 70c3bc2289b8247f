//! Error definitions for the relayer core.
//!
//! Failures that occur before a task is enqueued are synchronous and caller
//! visible; everything after enqueue is recorded into the task's status and
//! observed only through the read path.

use thiserror::Error;

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The work queue could not accept or deliver an item.
    #[error("Queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Submission validation failures, rejected before any side effect
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing idempotency key")]
    MissingIdempotencyKey,

    #[error("invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("{0}")]
    Multiple(String),
}

/// State store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("operation failed: {0}")]
    Operation(String),

    /// A stored value did not round-trip through its expected representation.
    #[error("corrupted record: {0}")]
    Corrupted(String),
}

/// Chain client failures
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The node rejected the broadcast; recorded as `failed_to_send`.
    #[error("broadcast rejected: {0}")]
    Broadcast(String),

    /// The node reported a receipt status outside the closed set we accept.
    #[error("unrecognized transaction status: {0}")]
    UnrecognizedStatus(String),
}

/// Configuration failures raised during startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
