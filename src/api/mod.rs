//! The API layer, containing web handlers and routing.

pub mod handlers;
pub mod router;

pub use handlers::{
    AlreadyAcceptedResponse, ApiDoc, SubmitTxResponse, TaskStatusResponse, TxHashStatusResponse,
};
pub use router::create_router;
