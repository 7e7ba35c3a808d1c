//! Account domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::money::Money;
use crate::error::{ErrorKind, LedgerError};

/// Error returned when a path or CLI argument is not a usable id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    #[error("id must be an integer")]
    Invalid,
    #[error("id must be positive")]
    NonPositive,
}

pub(crate) fn parse_positive_id(s: &str) -> Result<i64, ParseIdError> {
    let raw: i64 = s.parse().map_err(|_| ParseIdError::Invalid)?;
    if raw <= 0 {
        return Err(ParseIdError::NonPositive);
    }
    Ok(raw)
}

/// Caller-assigned account identifier. Always positive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    /// Returns `None` unless `raw` is positive.
    pub fn new(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// Wraps a value already known to be valid (e.g. read back from storage).
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_positive_id(s).map(Self)
    }
}

/// An account holding a single-currency balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Never negative once committed.
    pub balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates an account with all fields specified (for storage reconstruction).
    pub fn from_parts(
        id: AccountId,
        balance: Money,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            balance,
            created_at,
            updated_at,
        }
    }

    /// Checks if the account can cover a debit of `amount`.
    pub fn has_sufficient_funds(&self, amount: Money) -> bool {
        self.balance >= amount
    }

    /// Balance this account would hold after debiting `amount`.
    pub fn balance_after_debit(&self, amount: Money) -> Result<Money, LedgerError> {
        if !self.has_sufficient_funds(amount) {
            return Err(ErrorKind::InsufficientBalance.into());
        }
        self.balance.checked_sub(amount).ok_or_else(|| {
            LedgerError::new(ErrorKind::InternalError, "balance underflow on debit")
        })
    }

    /// Balance this account would hold after crediting `amount`.
    pub fn balance_after_credit(&self, amount: Money) -> Result<Money, LedgerError> {
        self.balance.checked_add(amount).ok_or_else(|| {
            LedgerError::new(ErrorKind::InternalError, "balance overflow on credit")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: i64, balance: &str) -> Account {
        let now = Utc::now();
        Account::from_parts(
            AccountId::new(id).unwrap(),
            Money::parse(balance).unwrap(),
            now,
            now,
        )
    }

    #[test]
    fn test_account_id_must_be_positive() {
        assert!(AccountId::new(1).is_some());
        assert!(AccountId::new(0).is_none());
        assert!(AccountId::new(-5).is_none());
    }

    #[test]
    fn test_account_id_from_str() {
        assert_eq!("42".parse::<AccountId>().unwrap().get(), 42);
        assert_eq!("0".parse::<AccountId>(), Err(ParseIdError::NonPositive));
        assert_eq!("abc".parse::<AccountId>(), Err(ParseIdError::Invalid));
        assert_eq!("1.5".parse::<AccountId>(), Err(ParseIdError::Invalid));
    }

    #[test]
    fn test_debit_with_exact_balance() {
        let acc = account(1, "100.00");
        let after = acc.balance_after_debit(Money::parse("100").unwrap()).unwrap();
        assert_eq!(after, Money::ZERO);
    }

    #[test]
    fn test_debit_insufficient_funds() {
        let acc = account(1, "10");
        let err = acc
            .balance_after_debit(Money::parse("10.01").unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(err.message(), "insufficient balance for this transaction");
    }

    #[test]
    fn test_credit() {
        let acc = account(2, "0.5");
        let after = acc.balance_after_credit(Money::parse("0.25").unwrap()).unwrap();
        assert_eq!(after.to_string(), "0.75");
    }
}
