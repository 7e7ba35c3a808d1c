//! Account opening and lookup.

use std::sync::Arc;

use ledger_types::{Account, AccountId, ErrorKind, LedgerError, LedgerStore, Money, StoreError};

/// Application service for account operations.
///
/// Generic over `S: LedgerStore` - the adapter is injected at compile time.
pub struct AccountService<S: LedgerStore> {
    store: Arc<S>,
}

impl<S: LedgerStore> AccountService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Opens an account with a caller-chosen id and opening balance.
    ///
    /// The balance must parse and be zero or greater. An id already taken,
    /// whether seen up front or lost in a race with a concurrent create,
    /// fails with `AccountAlreadyExists`.
    pub async fn create_account(
        &self,
        id: AccountId,
        initial_balance: &str,
    ) -> Result<Account, LedgerError> {
        let balance = Money::parse(initial_balance)?;
        if !balance.is_non_negative() {
            return Err(LedgerError::new(
                ErrorKind::InvalidAmount,
                "initial balance cannot be negative",
            ));
        }

        let exists = self.store.account_exists(id).await.map_err(|e| {
            LedgerError::wrap(ErrorKind::DatabaseError, "failed to check account", e)
        })?;
        if exists {
            return Err(ErrorKind::AccountAlreadyExists.into());
        }

        match self.store.create_account(id, balance).await {
            Ok(account) => {
                tracing::info!(account_id = %id, balance = %account.balance, "account created");
                Ok(account)
            }
            Err(StoreError::DuplicateAccount(_)) => Err(ErrorKind::AccountAlreadyExists.into()),
            Err(e) => Err(LedgerError::wrap(
                ErrorKind::DatabaseError,
                "failed to create account",
                e,
            )),
        }
    }

    /// Gets an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .get_account(id)
            .await
            .map_err(|e| LedgerError::wrap(ErrorKind::DatabaseError, "failed to load account", e))?
            .ok_or_else(|| {
                LedgerError::new(ErrorKind::AccountNotFound, format!("account {} not found", id))
            })
    }
}

impl<S: LedgerStore> Clone for AccountService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}
