//! Application layer containing business logic and background workers.

pub mod poller;
pub mod service;
pub mod state;
pub mod worker;

pub use poller::{PollerConfig, backoff_schedule, poll_confirmation};
pub use service::RelayerService;
pub use state::AppState;
pub use worker::{DispatchConfig, spawn_dispatch_worker};
