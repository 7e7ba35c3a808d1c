//! Transfer records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::account::{AccountId, ParseIdError, parse_positive_id};
use super::money::Money;
use crate::error::{ErrorKind, LedgerError};

/// Store-assigned transaction identifier, unique and increasing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct TransactionId(i64);

impl TransactionId {
    pub fn new(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_positive_id(s).map(Self)
    }
}

/// A validated transfer that has not been recorded yet.
///
/// Construction enforces distinct accounts and a strictly positive amount,
/// so anything holding a `NewTransfer` can skip those checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTransfer {
    source: AccountId,
    destination: AccountId,
    amount: Money,
}

impl NewTransfer {
    pub fn new(
        source: AccountId,
        destination: AccountId,
        amount: Money,
    ) -> Result<Self, LedgerError> {
        if source == destination {
            return Err(ErrorKind::SameAccount.into());
        }
        if !amount.is_positive() {
            return Err(LedgerError::new(
                ErrorKind::InvalidAmount,
                "amount must be greater than zero",
            ));
        }
        Ok(Self {
            source,
            destination,
            amount,
        })
    }

    pub fn source(&self) -> AccountId {
        self.source
    }

    pub fn destination(&self) -> AccountId {
        self.destination
    }

    pub fn amount(&self) -> Money {
        self.amount
    }
}

/// A committed transfer between two accounts. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Builds the record for `transfer` once the store has assigned an id.
    pub fn recorded(id: TransactionId, transfer: &NewTransfer, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            source_account_id: transfer.source,
            destination_account_id: transfer.destination,
            amount: transfer.amount,
            created_at,
        }
    }

    /// True if `account` is either side of this transfer.
    pub fn involves(&self, account: AccountId) -> bool {
        self.source_account_id == account || self.destination_account_id == account
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: i64) -> AccountId {
        AccountId::new(raw).unwrap()
    }

    #[test]
    fn test_new_transfer_valid() {
        let t = NewTransfer::new(id(1), id(2), Money::parse("25.5").unwrap()).unwrap();
        assert_eq!(t.source(), id(1));
        assert_eq!(t.destination(), id(2));
        assert_eq!(t.amount().to_string(), "25.5");
    }

    #[test]
    fn test_new_transfer_same_account() {
        let err = NewTransfer::new(id(3), id(3), Money::parse("1").unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SameAccount);
    }

    #[test]
    fn test_new_transfer_non_positive_amount() {
        for amount in ["0", "0.00", "-1"] {
            let err = NewTransfer::new(id(1), id(2), Money::parse(amount).unwrap()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidAmount);
        }
    }

    #[test]
    fn test_recorded_and_involves() {
        let t = NewTransfer::new(id(1), id(2), Money::parse("5").unwrap()).unwrap();
        let tx = Transaction::recorded(TransactionId::from_raw(9), &t, Utc::now());
        assert_eq!(tx.id.get(), 9);
        assert!(tx.involves(id(1)));
        assert!(tx.involves(id(2)));
        assert!(!tx.involves(id(3)));
    }
}
