//! Domain models for the ledger.

pub mod account;
pub mod money;
pub mod page;
pub mod transaction;

pub use account::{Account, AccountId, ParseIdError};
pub use money::Money;
pub use page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page};
pub use transaction::{NewTransfer, Transaction, TransactionId};
