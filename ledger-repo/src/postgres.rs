//! PostgreSQL store adapter.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};

use ledger_types::{
    Account, AccountId, LedgerStore, Money, NewTransfer, Page, StoreError, Transaction,
    TransactionId,
};

use crate::types::{DbAccount, DbInserted, DbTransaction};

/// An open PostgreSQL transaction.
pub type PgTx = sqlx::Transaction<'static, Postgres>;

// ─────────────────────────────────────────────────────────────────────────────
// Error classification
// ─────────────────────────────────────────────────────────────────────────────

/// Maps a driver error onto [`StoreError`] by SQLSTATE and error class.
pub fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
            let message = db.message().to_string();
            match code.as_str() {
                // serialization_failure, deadlock_detected
                "40001" | "40P01" => StoreError::SerializationConflict(message),
                // lock_not_available, query_canceled (lock_timeout/statement_timeout)
                "55P03" | "57014" => StoreError::LockTimeout(message),
                // admin/crash shutdown, cannot_connect_now
                "57P01" | "57P02" | "57P03" => StoreError::ConnectionLost(message),
                c if c.starts_with("08") => StoreError::ConnectionLost(message),
                c if c.starts_with("23") => StoreError::ConstraintViolation(message),
                _ => StoreError::Database(message),
            }
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => StoreError::ConnectionLost(err.to_string()),
        _ => StoreError::Database(err.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Migrations
// ─────────────────────────────────────────────────────────────────────────────

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_ledger_pg.sql"),
        "0001",
    )
    .await
}

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Store
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL store using `SELECT ... FOR UPDATE` row locks.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects, sizes the pool and applies migrations.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;
        run_migrations(&pool).await?;
        tracing::info!(max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    /// Wraps an existing pool without running migrations.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with an existing pool).
    pub async fn create_schema(&self) -> Result<(), StoreError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[async_trait]
impl LedgerStore for PostgresStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        Ok(tx)
    }

    async fn lock_account_for_update(
        &self,
        tx: &mut PgTx,
        id: AccountId,
    ) -> Result<Account, StoreError> {
        let row: Option<DbAccount> = sqlx::query_as(
            r#"SELECT account_id, balance, created_at, updated_at
               FROM accounts WHERE account_id = $1 FOR UPDATE"#,
        )
        .bind(id.get())
        .fetch_optional(&mut **tx)
        .await
        .map_err(classify)?;

        row.map(DbAccount::into_domain)
            .ok_or(StoreError::AccountNotFound(id))
    }

    async fn write_balance(
        &self,
        tx: &mut PgTx,
        id: AccountId,
        balance: Money,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"UPDATE accounts SET balance = $1, updated_at = NOW() WHERE account_id = $2"#,
        )
        .bind(balance.as_decimal())
        .bind(id.get())
        .execute(&mut **tx)
        .await
        .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AccountNotFound(id));
        }
        Ok(())
    }

    async fn record_transfer(
        &self,
        tx: &mut PgTx,
        transfer: &NewTransfer,
    ) -> Result<Transaction, StoreError> {
        let inserted: DbInserted = sqlx::query_as(
            r#"INSERT INTO transactions (source_account_id, destination_account_id, amount, created_at)
               VALUES ($1, $2, $3, NOW())
               RETURNING transaction_id, created_at"#,
        )
        .bind(transfer.source().get())
        .bind(transfer.destination().get())
        .bind(transfer.amount().as_decimal())
        .fetch_one(&mut **tx)
        .await
        .map_err(classify)?;

        Ok(Transaction::recorded(
            TransactionId::from_raw(inserted.transaction_id),
            transfer,
            inserted.created_at,
        ))
    }

    async fn commit(&self, tx: PgTx) -> Result<(), StoreError> {
        tx.commit().await.map_err(classify)
    }

    async fn rollback(&self, tx: PgTx) -> Result<(), StoreError> {
        tx.rollback().await.map_err(classify)
    }

    async fn account_exists(&self, id: AccountId) -> Result<bool, StoreError> {
        let (exists,): (bool,) =
            sqlx::query_as(r#"SELECT EXISTS(SELECT 1 FROM accounts WHERE account_id = $1)"#)
                .bind(id.get())
                .fetch_one(&self.pool)
                .await
                .map_err(classify)?;
        Ok(exists)
    }

    async fn create_account(&self, id: AccountId, balance: Money) -> Result<Account, StoreError> {
        let row: DbAccount = sqlx::query_as(
            r#"INSERT INTO accounts (account_id, balance, created_at, updated_at)
               VALUES ($1, $2, NOW(), NOW())
               RETURNING account_id, balance, created_at, updated_at"#,
        )
        .bind(id.get())
        .bind(balance.as_decimal())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateAccount(id)
            }
            _ => classify(e),
        })?;

        Ok(row.into_domain())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row: Option<DbAccount> = sqlx::query_as(
            r#"SELECT account_id, balance, created_at, updated_at FROM accounts WHERE account_id = $1"#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.map(DbAccount::into_domain))
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let row: Option<DbTransaction> = sqlx::query_as(
            r#"SELECT transaction_id, source_account_id, destination_account_id, amount, created_at
               FROM transactions WHERE transaction_id = $1"#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.map(DbTransaction::into_domain))
    }

    async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
        page: Page,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows: Vec<DbTransaction> = sqlx::query_as(
            r#"SELECT transaction_id, source_account_id, destination_account_id, amount, created_at
               FROM transactions
               WHERE source_account_id = $1 OR destination_account_id = $1
               ORDER BY created_at DESC, transaction_id DESC
               LIMIT $2 OFFSET $3"#,
        )
        .bind(account_id.get())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        Ok(rows.into_iter().map(DbTransaction::into_domain).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }
}
