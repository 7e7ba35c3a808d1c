//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application services.

pub(crate) mod handlers;
mod server;
mod validation;

pub use handlers::{ApiError, AppState, DEFAULT_REQUEST_TIMEOUT};
pub use server::HttpServer;
pub use validation::{validate_create_account, validate_create_transaction};
