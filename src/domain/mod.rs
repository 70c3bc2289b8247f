//! Domain layer containing core business types, traits, and error definitions.

pub mod error;
pub mod keys;
pub mod traits;
pub mod types;

pub use error::{AppError, ChainError, ConfigError, StoreError, ValidationError};
pub use traits::{ChainClient, StateStore};
pub use types::{
    ChainTxStatus, ErrorDetail, ErrorResponse, HealthResponse, HealthStatus, SystemStatus,
    TaskStatus, TaskStatusView, TaskTicket, TransferRequest, WorkItem,
};
