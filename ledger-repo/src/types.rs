//! Database row types for the PostgreSQL adapter.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use ledger_types::{Account, AccountId, Money, Transaction, TransactionId};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Account row from database.
#[derive(FromRow)]
pub struct DbAccount {
    pub account_id: i64,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbAccount {
    pub fn into_domain(self) -> Account {
        Account::from_parts(
            AccountId::from_raw(self.account_id),
            Money::from_decimal(self.balance),
            self.created_at,
            self.updated_at,
        )
    }
}

/// Transaction row from database.
#[derive(FromRow)]
pub struct DbTransaction {
    pub transaction_id: i64,
    pub source_account_id: i64,
    pub destination_account_id: i64,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl DbTransaction {
    pub fn into_domain(self) -> Transaction {
        Transaction {
            id: TransactionId::from_raw(self.transaction_id),
            source_account_id: AccountId::from_raw(self.source_account_id),
            destination_account_id: AccountId::from_raw(self.destination_account_id),
            amount: Money::from_decimal(self.amount),
            created_at: self.created_at,
        }
    }
}

/// Columns returned by the transfer insert.
#[derive(FromRow)]
pub struct DbInserted {
    pub transaction_id: i64,
    pub created_at: DateTime<Utc>,
}
