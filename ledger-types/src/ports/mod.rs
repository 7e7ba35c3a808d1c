//! Port traits (interfaces for adapters).
//!
//! The services depend on these traits, never on a concrete store.

mod store;

pub use store::LedgerStore;
