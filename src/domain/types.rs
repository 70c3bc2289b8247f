//! Domain types with validation support.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Lifecycle status of a relayed transfer task.
///
/// Transitions are forward-only:
/// `queued → processing → {sent → {confirmed|failed|pending}} | failed_to_send`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Accepted and waiting in the work queue
    #[default]
    Queued,
    /// Picked up by the dispatch worker
    Processing,
    /// Broadcast to the chain, awaiting confirmation
    Sent,
    /// The chain client rejected the broadcast
    FailedToSend,
    /// Confirmed on chain
    Confirmed,
    /// Reverted or rejected on chain
    Failed,
    /// Confirmation tracking gave up; the transaction may still resolve later
    Pending,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Sent => "sent",
            Self::FailedToSend => "failed_to_send",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }

    /// No further transition is expected after a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::FailedToSend | Self::Confirmed | Self::Failed | Self::Pending
        )
    }

    /// Rank in the partial order
    /// `queued < processing < {sent, failed_to_send} < {confirmed, failed, pending}`.
    ///
    /// A valid status history is non-decreasing in this rank.
    #[must_use]
    pub fn phase(&self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Processing => 1,
            Self::Sent | Self::FailedToSend => 2,
            Self::Confirmed | Self::Failed | Self::Pending => 3,
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "sent" => Ok(Self::Sent),
            "failed_to_send" => Ok(Self::FailedToSend),
            "confirmed" => Ok(Self::Confirmed),
            "failed" => Ok(Self::Failed),
            "pending" => Ok(Self::Pending),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authoritative on-chain outcome reported by the chain client.
///
/// The client maps every node response into this closed set; an answer that
/// does not fit is an error, never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChainTxStatus {
    Confirmed,
    Failed,
}

impl ChainTxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ChainTxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ChainTxStatus> for TaskStatus {
    fn from(status: ChainTxStatus) -> Self {
        match status {
            ChainTxStatus::Confirmed => Self::Confirmed,
            ChainTxStatus::Failed => Self::Failed,
        }
    }
}

/// Parameters of a transfer, immutable once accepted
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq, ToSchema)]
pub struct TransferRequest {
    /// Sender address; falls back to the relayer's configured account
    #[schema(example = "0x9aF1d4F0aA79Bd3b1bd36e7dC5bD7b7E5d2C8a11")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Recipient address
    #[validate(length(min = 1, message = "To address is required"))]
    #[schema(example = "0xDE0b295669a9FD93d5F28D9Ec85E40f4cb697BAe")]
    pub to: String,
    /// Amount in wei
    #[validate(length(min = 1, message = "Value is required"))]
    #[schema(example = "1000000000000000000")]
    pub value: String,
    /// Gas price in wei; estimated by the node when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    /// Gas limit; estimated by the node when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
}

impl TransferRequest {
    #[must_use]
    pub fn new(to: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            from: None,
            to: to.into(),
            value: value.into(),
            gas_price: None,
            gas_limit: None,
        }
    }
}

/// Serialized work queue payload carried from the gateway to the dispatch worker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkItem {
    pub task_id: String,
    #[serde(rename = "req")]
    pub request: TransferRequest,
}

/// Outcome of a submission: the task identifier, and whether this call
/// created the task or replayed an earlier acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTicket {
    pub task_id: String,
    pub accepted: bool,
}

/// Read-path view of a task; absent keys yield `None`, never an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatusView {
    pub task_id: String,
    pub tx_hash: Option<String>,
    pub status: Option<TaskStatus>,
}

/// Health status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Some systems degraded but functional
    Degraded,
    /// Critical systems unavailable
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall system status
    pub status: HealthStatus,
    /// State store health status
    pub store: HealthStatus,
    /// Chain client health status
    pub chain: HealthStatus,
    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
    /// Application version
    #[schema(example = "0.1.0")]
    pub version: String,
}

impl HealthResponse {
    #[must_use]
    pub fn new(store: HealthStatus, chain: HealthStatus) -> Self {
        let status = match (&store, &chain) {
            (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            _ => HealthStatus::Degraded,
        };
        Self {
            status,
            store,
            chain,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Aggregate system status: store reachability, queue depth, chain head
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SystemStatus {
    /// State store reachability
    pub store: HealthStatus,
    /// Number of work items waiting for the dispatch worker
    pub queue_depth: u64,
    /// Latest block number reported by the chain client
    pub latest_block: Option<u64>,
    /// Chain client error, if the head query failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_error: Option<String>,
    /// Application version
    #[schema(example = "0.1.0")]
    pub version: String,
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Error type identifier
    #[schema(example = "validation_error")]
    pub r#type: String,
    /// Human-readable error message
    #[schema(example = "To address is required")]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_task_status_display_and_parsing() {
        let statuses = vec![
            (TaskStatus::Queued, "queued"),
            (TaskStatus::Processing, "processing"),
            (TaskStatus::Sent, "sent"),
            (TaskStatus::FailedToSend, "failed_to_send"),
            (TaskStatus::Confirmed, "confirmed"),
            (TaskStatus::Failed, "failed"),
            (TaskStatus::Pending, "pending"),
        ];

        for (status, string) in statuses {
            assert_eq!(status.as_str(), string);
            assert_eq!(status.to_string(), string);
            assert_eq!(TaskStatus::from_str(string).unwrap(), status);
        }

        assert!(TaskStatus::from_str("invalid").is_err());
        assert!(TaskStatus::from_str("success").is_err());
    }

    #[test]
    fn test_task_status_phases_are_monotonic_along_lifecycle() {
        assert!(TaskStatus::Queued.phase() < TaskStatus::Processing.phase());
        assert!(TaskStatus::Processing.phase() < TaskStatus::Sent.phase());
        assert!(TaskStatus::Processing.phase() < TaskStatus::FailedToSend.phase());
        assert!(TaskStatus::Sent.phase() < TaskStatus::Confirmed.phase());
        assert!(TaskStatus::Sent.phase() < TaskStatus::Failed.phase());
        assert!(TaskStatus::Sent.phase() < TaskStatus::Pending.phase());
        // The two broadcast outcomes share a phase; so do the three poller exits.
        assert_eq!(TaskStatus::Sent.phase(), TaskStatus::FailedToSend.phase());
        assert_eq!(TaskStatus::Confirmed.phase(), TaskStatus::Pending.phase());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(!TaskStatus::Sent.is_terminal());
        assert!(TaskStatus::FailedToSend.is_terminal());
        assert!(TaskStatus::Confirmed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Pending.is_terminal());
    }

    #[test]
    fn test_chain_status_maps_into_task_status() {
        assert_eq!(
            TaskStatus::from(ChainTxStatus::Confirmed),
            TaskStatus::Confirmed
        );
        assert_eq!(TaskStatus::from(ChainTxStatus::Failed), TaskStatus::Failed);
    }

    #[test]
    fn test_transfer_request_validation() {
        let req = TransferRequest::new("0xabc", "100");
        assert!(req.validate().is_ok());

        let req = TransferRequest::new("", "100");
        assert!(req.validate().is_err());

        let req = TransferRequest::new("0xabc", "");
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_work_item_wire_format() {
        let item = WorkItem {
            task_id: "t1".to_string(),
            request: TransferRequest::new("0xabc", "100"),
        };

        let json = serde_json::to_string(&item).unwrap();
        // The queue payload carries the request under the short "req" field.
        assert!(json.contains("\"req\""));
        assert!(!json.contains("gas_price"));

        let decoded: WorkItem = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, item);
    }

    #[test]
    fn test_work_item_rejects_malformed_payload() {
        assert!(serde_json::from_str::<WorkItem>("not json").is_err());
        assert!(serde_json::from_str::<WorkItem>(r#"{"task_id": "t1"}"#).is_err());
    }
}
