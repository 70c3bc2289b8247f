//! Queue-backed Ethereum transfer relayer.
//!
//! Submissions are deduplicated by caller-supplied idempotency key, handed to
//! a single dispatch worker over a FIFO work queue, broadcast through a chain
//! client, and then tracked to finality by per-transaction confirmation
//! pollers. Task state lives in an external key-value store with a 24h
//! retention window and is exposed read-only through a task identifier.

pub mod api;
pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
