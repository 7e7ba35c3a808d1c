//! In-memory store adapter.
//!
//! Behaves like the PostgreSQL adapter for everything the services rely on:
//! per-account exclusive locks held for the life of a store transaction,
//! staged writes that only become visible on commit, monotonically
//! increasing transaction ids, and a non-negative balance constraint.
//! Used by `memory://` deployments and throughout the test suites.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::OwnedMutexGuard;

use ledger_types::{
    Account, AccountId, LedgerStore, Money, NewTransfer, Page, StoreError, Transaction,
    TransactionId,
};

/// How long a transaction waits for another one to release a row lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

// ─────────────────────────────────────────────────────────────────────────────
// Rows
// ─────────────────────────────────────────────────────────────────────────────

struct AccountRow {
    /// Held by at most one store transaction at a time.
    lock: Arc<tokio::sync::Mutex<()>>,
    /// Last committed state.
    committed: Mutex<Account>,
}

impl AccountRow {
    fn new(account: Account) -> Self {
        Self {
            lock: Arc::new(tokio::sync::Mutex::new(())),
            committed: Mutex::new(account),
        }
    }

    fn snapshot(&self) -> Account {
        self.committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Open transaction against a [`MemoryStore`].
///
/// Dropping it releases every lock and discards staged changes, which is
/// exactly what rollback does.
pub struct MemoryTx {
    locks: HashMap<AccountId, OwnedMutexGuard<()>>,
    balances: HashMap<AccountId, Money>,
    transfers: Vec<Transaction>,
}

impl MemoryTx {
    fn new() -> Self {
        Self {
            locks: HashMap::new(),
            balances: HashMap::new(),
            transfers: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Thread-safe in-memory ledger.
pub struct MemoryStore {
    accounts: DashMap<AccountId, Arc<AccountRow>>,
    transactions: RwLock<BTreeMap<TransactionId, Transaction>>,
    next_transaction_id: AtomicI64,
    lock_timeout: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            transactions: RwLock::new(BTreeMap::new()),
            next_transaction_id: AtomicI64::new(1),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Overrides how long `lock_account_for_update` waits before giving up
    /// with [`StoreError::LockTimeout`].
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Number of committed transfers.
    pub fn transaction_count(&self) -> usize {
        self.transactions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn row(&self, id: AccountId) -> Result<Arc<AccountRow>, StoreError> {
        // Clone the Arc out so no shard guard is held across an await.
        self.accounts
            .get(&id)
            .map(|r| Arc::clone(r.value()))
            .ok_or(StoreError::AccountNotFound(id))
    }

    /// Takes the row lock for `tx` unless it already holds it.
    async fn acquire(
        &self,
        tx: &mut MemoryTx,
        id: AccountId,
    ) -> Result<Arc<AccountRow>, StoreError> {
        let row = self.row(id)?;
        if tx.locks.contains_key(&id) {
            return Ok(row);
        }

        let guard = tokio::time::timeout(self.lock_timeout, Arc::clone(&row.lock).lock_owned())
            .await
            .map_err(|_| {
                StoreError::LockTimeout(format!(
                    "timed out after {:?} waiting for account {}",
                    self.lock_timeout, id
                ))
            })?;
        tx.locks.insert(id, guard);
        Ok(row)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx::new())
    }

    async fn lock_account_for_update(
        &self,
        tx: &mut MemoryTx,
        id: AccountId,
    ) -> Result<Account, StoreError> {
        let row = self.acquire(tx, id).await?;
        let mut account = row.snapshot();
        if let Some(staged) = tx.balances.get(&id) {
            account.balance = *staged;
        }
        Ok(account)
    }

    async fn write_balance(
        &self,
        tx: &mut MemoryTx,
        id: AccountId,
        balance: Money,
    ) -> Result<(), StoreError> {
        if !balance.is_non_negative() {
            return Err(StoreError::ConstraintViolation(format!(
                "balance of account {} would become {}",
                id, balance
            )));
        }
        self.acquire(tx, id).await?;
        tx.balances.insert(id, balance);
        Ok(())
    }

    async fn record_transfer(
        &self,
        tx: &mut MemoryTx,
        transfer: &NewTransfer,
    ) -> Result<Transaction, StoreError> {
        for id in [transfer.source(), transfer.destination()] {
            if !self.accounts.contains_key(&id) {
                return Err(StoreError::ConstraintViolation(format!(
                    "transfer references missing account {}",
                    id
                )));
            }
        }

        let raw = self.next_transaction_id.fetch_add(1, Ordering::SeqCst);
        let recorded = Transaction::recorded(TransactionId::from_raw(raw), transfer, Utc::now());
        tx.transfers.push(recorded.clone());
        Ok(recorded)
    }

    async fn commit(&self, mut tx: MemoryTx) -> Result<(), StoreError> {
        let now = Utc::now();
        // Publish history and balances under the history write lock so no
        // reader sees one without the other.
        let mut history = self
            .transactions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        for (id, balance) in tx.balances.drain() {
            let row = self.row(id)?;
            let mut committed = row.committed.lock().unwrap_or_else(PoisonError::into_inner);
            committed.balance = balance;
            committed.updated_at = now;
        }
        for recorded in tx.transfers.drain(..) {
            history.insert(recorded.id, recorded);
        }
        drop(history);

        // Row locks are released here, after the new state is visible.
        drop(tx);
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTx) -> Result<(), StoreError> {
        drop(tx);
        Ok(())
    }

    async fn account_exists(&self, id: AccountId) -> Result<bool, StoreError> {
        Ok(self.accounts.contains_key(&id))
    }

    async fn create_account(&self, id: AccountId, balance: Money) -> Result<Account, StoreError> {
        if !balance.is_non_negative() {
            return Err(StoreError::ConstraintViolation(format!(
                "initial balance {} is negative",
                balance
            )));
        }

        match self.accounts.entry(id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateAccount(id)),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let account = Account::from_parts(id, balance, now, now);
                slot.insert(Arc::new(AccountRow::new(account.clone())));
                Ok(account)
            }
        }
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).map(|row| row.snapshot()))
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let history = self
            .transactions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(history.get(&id).cloned())
    }

    async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
        page: Page,
    ) -> Result<Vec<Transaction>, StoreError> {
        let history = self
            .transactions
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        // Walking ids backwards gives descending id order; the stable sort
        // keeps it as the tie-breaker for equal timestamps.
        let mut matching: Vec<Transaction> = history
            .values()
            .rev()
            .filter(|t| t.involves(account_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
