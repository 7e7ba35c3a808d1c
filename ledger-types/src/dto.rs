//! Data Transfer Objects (DTOs) for requests and responses.
//!
//! Request bodies keep ids as raw integers and amounts as strings so the HTTP
//! layer can report every invalid field at once instead of failing on the
//! first bad value during deserialization.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Account, Transaction};

// ─────────────────────────────────────────────────────────────────────────────
// Account DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to open an account with a caller-chosen id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct CreateAccountRequest {
    /// Positive account identifier
    #[schema(example = 1)]
    pub account_id: i64,
    /// Opening balance as a decimal string, zero or greater
    #[schema(example = "1000.00")]
    pub initial_balance: String,
}

/// Account as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    #[schema(example = 1)]
    pub account_id: i64,
    /// Current balance in canonical decimal form
    #[schema(example = "1000")]
    pub balance: String,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id.get(),
            balance: account.balance.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to move money between two accounts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct CreateTransactionRequest {
    #[schema(example = 1)]
    pub source_account_id: i64,
    #[schema(example = 2)]
    pub destination_account_id: i64,
    /// Positive decimal string
    #[schema(example = "100.25")]
    pub amount: String,
}

/// A recorded transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    #[schema(example = 1)]
    pub transaction_id: i64,
    #[schema(example = 1)]
    pub source_account_id: i64,
    #[schema(example = 2)]
    pub destination_account_id: i64,
    #[schema(example = "100.25")]
    pub amount: String,
    /// RFC 3339 timestamp
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub created_at: String,
}

impl From<&Transaction> for TransactionResponse {
    fn from(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.id.get(),
            source_account_id: tx.source_account_id.get(),
            destination_account_id: tx.destination_account_id.get(),
            amount: tx.amount.to_string(),
            created_at: tx.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Pagination for account history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionListQuery {
    /// Page size (default 20, max 100)
    pub limit: Option<i64>,
    /// Number of records to skip
    pub offset: Option<i64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Error DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Error body for every failed request except field validation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    /// Stable error code
    #[schema(example = "insufficient_balance")]
    pub error: String,
    #[schema(example = "insufficient balance for this transaction")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// One invalid request field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "amount")]
    pub field: String,
    #[schema(example = "must be greater than zero")]
    pub message: String,
}

/// Error body listing every invalid field.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorResponse {
    pub success: bool,
    #[schema(example = "validation_failed")]
    pub error: String,
    pub errors: Vec<FieldError>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Probe DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "ledger-transfers")]
    pub service: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadyChecks {
    #[schema(example = "ok")]
    pub database: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadyResponse {
    #[schema(example = "ready")]
    pub status: String,
    pub checks: ReadyChecks,
}
