//! # Ledger Types
//!
//! Domain types and port traits for the ledger transfer service.
//! This crate has ZERO IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Account, Transaction, Page)
//! - `ports/` - The store trait that adapters must implement
//! - `dto/` - Data Transfer Objects for the HTTP boundary
//! - `error/` - Domain error model and store error classification

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Account, AccountId, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Money, NewTransfer, Page, ParseIdError,
    Transaction, TransactionId,
};
pub use dto::*;
pub use error::{Cause, ErrorKind, LedgerError, StoreError, is_retryable};
pub use ports::LedgerStore;
