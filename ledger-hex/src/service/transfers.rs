//! Transfer engine.
//!
//! Moves money between two accounts as one atomic store transaction:
//! lock both rows (lowest id first), check funds, write both balances,
//! record the transfer, commit. Attempts that fail with a transient store
//! error are retried with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use ledger_types::{
    Account, AccountId, ErrorKind, LedgerError, LedgerStore, Money, NewTransfer, Page,
    StoreError, Transaction, TransactionId,
};

use super::observer::{TracingObserver, TransferObserver};

/// Retry policy for [`TransferEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    /// Retries after the first attempt, so at most `max_retries + 1` attempts.
    pub max_retries: u32,
    /// Delay before retry `n` is `retry_base_delay * 2^(n-1)`.
    pub retry_base_delay: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_millis(100),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Caller context
// ─────────────────────────────────────────────────────────────────────────────

/// Cancellation and deadline supplied by whoever asked for the transfer.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallerContext {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Never cancelled, no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// A timeout too large to express as an instant leaves no deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn check(&self) -> Result<(), TransferError> {
        if self.token.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(TransferError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Sleeps for `delay` unless the caller gives up first.
    async fn wait(&self, delay: Duration) -> Result<(), TransferError> {
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(TransferError::Cancelled),
            _ = deadline => Err(TransferError::DeadlineExceeded),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

/// Outcome of a failed transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("request cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl TransferError {
    /// Domain kind, if this is a domain failure.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            TransferError::Ledger(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// How one attempt ended, when it did not succeed.
enum AttemptFailure {
    /// Returned to the caller as is.
    Fatal(LedgerError),
    /// Retried if the cause is transient.
    Candidate(LedgerError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Executes transfers against any [`LedgerStore`].
///
/// Holds no mutable state; all serialization between concurrent transfers
/// happens in the store's row locks. Share it through `Arc`.
pub struct TransferEngine<S: LedgerStore> {
    store: Arc<S>,
    config: TransferConfig,
    observer: Arc<dyn TransferObserver>,
}

impl<S: LedgerStore> TransferEngine<S> {
    pub fn new(store: Arc<S>, config: TransferConfig) -> Self {
        Self {
            store,
            config,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replaces the default tracing observer.
    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> TransferConfig {
        self.config
    }

    /// Moves `amount` from `source` to `destination`.
    ///
    /// Same-account and non-positive or unparsable amounts are rejected
    /// before touching the store. The caller context is checked before each
    /// attempt and during backoff; an attempt already in flight always runs
    /// to commit or rollback.
    pub async fn transfer(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: &str,
        ctx: &CallerContext,
    ) -> Result<Transaction, TransferError> {
        let transfer = match validate(source, destination, amount) {
            Ok(t) => t,
            Err(e) => {
                self.observer.rejected(source, destination, &e);
                return Err(e.into());
            }
        };

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            let ready = match ctx.check() {
                Ok(()) if attempt > 0 => {
                    let delay = self.backoff(attempt);
                    self.observer.backing_off(&transfer, attempt, delay);
                    ctx.wait(delay).await
                }
                other => other,
            };
            if let Err(reason) = ready {
                self.observer.cancelled(&transfer, &reason);
                return Err(reason);
            }

            self.observer.attempt_started(&transfer, attempt);
            match self.attempt(&transfer).await {
                Ok(recorded) => {
                    self.observer.succeeded(&recorded, attempt + 1);
                    return Ok(recorded);
                }
                Err(AttemptFailure::Candidate(err)) if err.is_retryable() => {
                    self.observer.retryable_failure(&transfer, attempt, &err);
                    last_error = Some(err);
                }
                Err(AttemptFailure::Candidate(err) | AttemptFailure::Fatal(err)) => {
                    self.observer.failed(&transfer, attempt + 1, &err);
                    return Err(err.into());
                }
            }
        }

        let err = match last_error {
            Some(cause) => LedgerError::wrap(
                ErrorKind::TransactionFailed,
                "transfer failed after retries",
                cause,
            ),
            None => LedgerError::new(ErrorKind::TransactionFailed, "transfer failed after retries"),
        };
        self.observer
            .failed(&transfer, self.config.max_retries + 1, &err);
        Err(err.into())
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.config.retry_base_delay.saturating_mul(factor)
    }

    /// One store transaction. Rolls back on every failure after `begin`.
    async fn attempt(&self, transfer: &NewTransfer) -> Result<Transaction, AttemptFailure> {
        let mut tx = self.store.begin().await.map_err(|e| {
            AttemptFailure::Fatal(LedgerError::wrap(
                ErrorKind::DatabaseError,
                "failed to begin transaction",
                e,
            ))
        })?;

        let recorded = match self.apply(&mut tx, transfer).await {
            Ok(recorded) => recorded,
            Err(failure) => {
                if let Err(e) = self.store.rollback(tx).await {
                    self.observer.rollback_failed(transfer, &e);
                }
                return Err(failure);
            }
        };

        self.store.commit(tx).await.map_err(|e| {
            AttemptFailure::Candidate(LedgerError::wrap(
                ErrorKind::DatabaseError,
                "failed to commit transaction",
                e,
            ))
        })?;
        Ok(recorded)
    }

    async fn apply(
        &self,
        tx: &mut S::Tx,
        transfer: &NewTransfer,
    ) -> Result<Transaction, AttemptFailure> {
        let (first, second) = lock_order(transfer.source(), transfer.destination());
        let first = self.lock(tx, first).await?;
        let second = self.lock(tx, second).await?;

        let (source, destination) = if first.id == transfer.source() {
            (first, second)
        } else {
            (second, first)
        };

        let new_source = source
            .balance_after_debit(transfer.amount())
            .map_err(AttemptFailure::Fatal)?;
        let new_destination = destination
            .balance_after_credit(transfer.amount())
            .map_err(AttemptFailure::Fatal)?;

        self.write(tx, source.id, new_source, "failed to update source balance")
            .await?;
        self.write(
            tx,
            destination.id,
            new_destination,
            "failed to update destination balance",
        )
        .await?;

        self.store
            .record_transfer(tx, transfer)
            .await
            .map_err(|e| {
                AttemptFailure::Candidate(LedgerError::wrap(
                    ErrorKind::DatabaseError,
                    "failed to record transaction",
                    e,
                ))
            })
    }

    async fn lock(&self, tx: &mut S::Tx, id: AccountId) -> Result<Account, AttemptFailure> {
        match self.store.lock_account_for_update(tx, id).await {
            Ok(account) => Ok(account),
            Err(StoreError::AccountNotFound(_)) => Err(AttemptFailure::Fatal(LedgerError::new(
                ErrorKind::AccountNotFound,
                format!("account {} not found", id),
            ))),
            Err(e) => Err(AttemptFailure::Candidate(LedgerError::wrap(
                ErrorKind::DatabaseError,
                format!("failed to lock account {}", id),
                e,
            ))),
        }
    }

    async fn write(
        &self,
        tx: &mut S::Tx,
        id: AccountId,
        balance: Money,
        context: &'static str,
    ) -> Result<(), AttemptFailure> {
        self.store
            .write_balance(tx, id, balance)
            .await
            .map_err(|e| AttemptFailure::Candidate(LedgerError::wrap(ErrorKind::DatabaseError, context, e)))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Transaction History
    // ─────────────────────────────────────────────────────────────────────────────

    /// Gets a recorded transfer by ID.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.store
            .get_transaction(id)
            .await
            .map_err(|e| {
                LedgerError::wrap(ErrorKind::DatabaseError, "failed to load transaction", e)
            })?
            .ok_or_else(|| {
                LedgerError::new(
                    ErrorKind::TransferNotFound,
                    format!("transaction {} not found", id),
                )
            })
    }

    /// Transfers touching `account`, newest first. Page size defaults to 20
    /// and is capped at 100; an empty page is not an error.
    pub async fn list_account_transactions(
        &self,
        account: AccountId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.store
            .list_transactions_for_account(account, Page::new(limit, offset))
            .await
            .map_err(|e| {
                LedgerError::wrap(ErrorKind::DatabaseError, "failed to list transactions", e)
            })
    }
}

fn validate(
    source: AccountId,
    destination: AccountId,
    amount: &str,
) -> Result<NewTransfer, LedgerError> {
    if source == destination {
        return Err(ErrorKind::SameAccount.into());
    }
    let amount = Money::parse(amount)?;
    NewTransfer::new(source, destination, amount)
}

/// Lowest id first. Every transfer locks in this order, so two transfers
/// over the same pair can never wait on each other in a cycle.
fn lock_order(a: AccountId, b: AccountId) -> (AccountId, AccountId) {
    if a < b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: i64) -> AccountId {
        AccountId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_huge_timeout_means_no_deadline() {
        let ctx = CallerContext::background().with_timeout(Duration::from_secs(u64::MAX));
        assert!(ctx.deadline().is_none());
        assert!(ctx.check().is_ok());

        let ctx = CallerContext::background().with_timeout(Duration::from_secs(15));
        assert!(ctx.deadline().is_some());
    }

    #[test]
    fn test_lock_order() {
        assert_eq!(lock_order(id(2), id(1)), (id(1), id(2)));
        assert_eq!(lock_order(id(1), id(2)), (id(1), id(2)));
        assert_eq!(lock_order(id(10), id(9)), (id(9), id(10)));
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            validate(id(1), id(1), "5").unwrap_err().kind(),
            ErrorKind::SameAccount
        );
        assert_eq!(
            validate(id(1), id(2), "").unwrap_err().kind(),
            ErrorKind::InvalidAmount
        );
        assert_eq!(
            validate(id(1), id(2), "-5").unwrap_err().kind(),
            ErrorKind::InvalidAmount
        );
        assert!(validate(id(1), id(2), "0.01").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_honours_cancellation() {
        let ctx = CallerContext::new(CancellationToken::new());
        ctx.token().cancel();
        assert!(matches!(
            ctx.wait(Duration::from_secs(10)).await,
            Err(TransferError::Cancelled)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_honours_deadline() {
        let ctx = CallerContext::background().with_timeout(Duration::from_millis(50));
        assert!(matches!(
            ctx.wait(Duration::from_secs(10)).await,
            Err(TransferError::DeadlineExceeded)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_completes() {
        let ctx = CallerContext::background();
        assert!(ctx.wait(Duration::from_millis(100)).await.is_ok());
    }
}
