//! Error types for the ledger.
//!
//! Two layers live here: [`StoreError`] is what storage adapters report, and
//! [`LedgerError`] is the domain error every service returns. A `LedgerError`
//! may wrap a `StoreError` as its cause; retry decisions look at that cause.

use std::fmt;

use crate::domain::AccountId;

/// Closed set of domain error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AccountNotFound,
    AccountAlreadyExists,
    InsufficientBalance,
    InvalidAmount,
    SameAccount,
    TransferNotFound,
    DuplicateTransaction,
    DatabaseError,
    TransactionFailed,
    InternalError,
}

impl ErrorKind {
    /// Stable snake-case code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::AccountNotFound => "account_not_found",
            ErrorKind::AccountAlreadyExists => "account_exists",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::InvalidAmount => "invalid_amount",
            ErrorKind::SameAccount => "same_account",
            ErrorKind::TransferNotFound => "transaction_not_found",
            ErrorKind::DuplicateTransaction => "duplicate_transaction",
            ErrorKind::DatabaseError => "database_error",
            ErrorKind::TransactionFailed => "transaction_failed",
            ErrorKind::InternalError => "internal_error",
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::AccountNotFound => "account not found",
            ErrorKind::AccountAlreadyExists => "account with this ID already exists",
            ErrorKind::InsufficientBalance => "insufficient balance for this transaction",
            ErrorKind::InvalidAmount => "amount must be a positive decimal value",
            ErrorKind::SameAccount => "source and destination accounts cannot be the same",
            ErrorKind::TransferNotFound => "transaction not found",
            ErrorKind::DuplicateTransaction => "duplicate transaction",
            ErrorKind::DatabaseError => "database operation failed",
            ErrorKind::TransactionFailed => "transaction failed",
            ErrorKind::InternalError => "internal server error",
        }
    }

    /// Infrastructure kinds whose details must not reach API callers.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            ErrorKind::DatabaseError | ErrorKind::TransactionFailed | ErrorKind::InternalError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failures reported by a [`LedgerStore`](crate::ports::LedgerStore) adapter.
///
/// Adapters classify their native errors into these variants so the domain
/// never has to inspect driver messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("account {0} already exists")]
    DuplicateAccount(AccountId),

    /// Serialization failure or detected deadlock.
    #[error("serialization conflict: {0}")]
    SerializationConflict(String),

    #[error("lock wait timed out: {0}")]
    LockTimeout(String),

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// True for failures that may succeed if the whole unit of work is retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::SerializationConflict(_)
                | StoreError::LockTimeout(_)
                | StoreError::ConnectionLost(_)
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain errors
// ─────────────────────────────────────────────────────────────────────────────

/// Underlying cause wrapped by a [`LedgerError`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum Cause {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(Box<LedgerError>),
}

/// Domain error: a kind, a human message and an optional cause.
///
/// Two errors compare equal when their kinds match; messages and causes are
/// informational only.
#[derive(Debug, Clone)]
pub struct LedgerError {
    kind: ErrorKind,
    message: String,
    cause: Option<Cause>,
}

impl LedgerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Builds an error of `kind` that wraps `cause`.
    pub fn wrap(kind: ErrorKind, message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// The innermost store error in the cause chain, if any.
    pub fn store_cause(&self) -> Option<&StoreError> {
        match self.cause.as_ref()? {
            Cause::Store(e) => Some(e),
            Cause::Ledger(inner) => inner.store_cause(),
        }
    }

    /// True when the cause chain ends in a transient store failure.
    pub fn is_retryable(&self) -> bool {
        self.store_cause().is_some_and(StoreError::is_transient)
    }
}

/// Free-function form of [`LedgerError::is_retryable`].
pub fn is_retryable(err: &LedgerError) -> bool {
    err.is_retryable()
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for LedgerError {}

impl From<ErrorKind> for LedgerError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind, kind.default_message())
    }
}

impl From<LedgerError> for Cause {
    fn from(err: LedgerError) -> Self {
        Cause::Ledger(Box::new(err))
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        let kind = match &err {
            StoreError::AccountNotFound(_) => ErrorKind::AccountNotFound,
            StoreError::DuplicateAccount(_) => ErrorKind::AccountAlreadyExists,
            _ => ErrorKind::DatabaseError,
        };
        let message = match &err {
            StoreError::AccountNotFound(id) => format!("account {} not found", id),
            StoreError::DuplicateAccount(_) => kind.default_message().to_string(),
            _ => "database operation failed".to_string(),
        };
        Self::wrap(kind, message, err)
    }
}
