//! Ledger Application Services
//!
//! Orchestrate domain operations through the store port.
//! Contain NO infrastructure logic - pure business orchestration.

mod accounts;
mod observer;
mod transfers;

pub use accounts::AccountService;
pub use observer::{TracingObserver, TransferObserver};
pub use transfers::{CallerContext, TransferConfig, TransferEngine, TransferError};
