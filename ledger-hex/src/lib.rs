//! # Ledger Hex
//!
//! Application services and HTTP adapter for the ledger transfer service.
//!
//! ## Architecture
//!
//! - `service/` - Account service and the transfer engine (locking, retries)
//! - `inbound/` - HTTP adapter (Axum server)
//! - `openapi` - Generated API document served at `/swagger-ui`
//!
//! Everything is generic over `S: LedgerStore`, so the same engine runs
//! against the in-memory store in tests and PostgreSQL in production.

pub mod inbound;
pub mod openapi;
pub mod service;


pub use service::{
    AccountService, CallerContext, TracingObserver, TransferConfig, TransferEngine, TransferError,
    TransferObserver,
};
