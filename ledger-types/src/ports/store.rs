//! Ledger store port.
//!
//! This is the primary port in the hexagonal layout. The PostgreSQL and
//! in-memory adapters implement it, and so do test doubles.

use crate::domain::{Account, AccountId, Money, NewTransfer, Page, Transaction, TransactionId};
use crate::error::StoreError;

/// Persistent storage for accounts and transfers.
///
/// Balance changes happen only inside a store transaction (`Self::Tx`). The
/// transaction value is consumed by [`commit`](Self::commit) or
/// [`rollback`](Self::rollback), so each scope ends exactly once. Dropping a
/// transaction without either must behave like a rollback.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Open store transaction. Holds every row lock taken through it.
    type Tx: Send + 'static;

    // ─────────────────────────────────────────────────────────────────────────────
    // Transactional Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Starts a read-committed transaction.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Locks the account row until `tx` ends and returns its current state.
    ///
    /// Another transaction locking the same id waits until this one ends.
    async fn lock_account_for_update(
        &self,
        tx: &mut Self::Tx,
        id: AccountId,
    ) -> Result<Account, StoreError>;

    /// Overwrites the balance of a row. Zero affected rows is `AccountNotFound`.
    async fn write_balance(
        &self,
        tx: &mut Self::Tx,
        id: AccountId,
        balance: Money,
    ) -> Result<(), StoreError>;

    /// Inserts the transfer record, assigning its id and timestamp.
    async fn record_transfer(
        &self,
        tx: &mut Self::Tx,
        transfer: &NewTransfer,
    ) -> Result<Transaction, StoreError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Account Operations
    // ─────────────────────────────────────────────────────────────────────────────

    async fn account_exists(&self, id: AccountId) -> Result<bool, StoreError>;

    /// Inserts an account. An existing id yields `DuplicateAccount`.
    async fn create_account(&self, id: AccountId, balance: Money)
    -> Result<Account, StoreError>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // History & Health
    // ─────────────────────────────────────────────────────────────────────────────

    async fn get_transaction(&self, id: TransactionId)
    -> Result<Option<Transaction>, StoreError>;

    /// Transfers touching `account_id`, newest first (ties by descending id).
    async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
        page: Page,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Cheap round trip used by readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}
