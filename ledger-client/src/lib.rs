//! # Ledger Client SDK
//!
//! A typed Rust client for the Ledger API.
//!
//! Amounts are passed and returned as decimal strings, exactly as the
//! server expects them.

use ledger_types::{
    AccountId, AccountResponse, CreateAccountRequest, CreateTransactionRequest, HealthResponse,
    TransactionId, TransactionResponse,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("API error: {status} {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// The server's error code (`insufficient_balance`, ...), if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Ledger API client.
pub struct LedgerClient {
    base_url: String,
    http: Client,
}

impl LedgerClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Returns the liveness report.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get("/health").await
    }

    /// Opens an account with a caller-chosen id.
    pub async fn create_account(
        &self,
        id: AccountId,
        initial_balance: &str,
    ) -> Result<AccountResponse, ClientError> {
        let req = CreateAccountRequest {
            account_id: id.get(),
            initial_balance: initial_balance.to_string(),
        };
        self.post("/api/v1/accounts", &req).await
    }

    /// Gets an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<AccountResponse, ClientError> {
        self.get(&format!("/api/v1/accounts/{}", id)).await
    }

    /// Transfers money between accounts.
    pub async fn transfer(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: &str,
    ) -> Result<TransactionResponse, ClientError> {
        let req = CreateTransactionRequest {
            source_account_id: source.get(),
            destination_account_id: destination.get(),
            amount: amount.to_string(),
        };
        self.post("/api/v1/transactions", &req).await
    }

    /// Gets a recorded transfer by ID.
    pub async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<TransactionResponse, ClientError> {
        self.get(&format!("/api/v1/transactions/{}", id)).await
    }

    /// Lists transfers touching an account, newest first.
    pub async fn list_transactions(
        &self,
        account: AccountId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<TransactionResponse>, ClientError> {
        self.get(&history_path(account, limit, offset)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(api_error(status.as_u16(), &body))
        }
    }
}

fn history_path(account: AccountId, limit: Option<i64>, offset: Option<i64>) -> String {
    let mut params = Vec::new();
    if let Some(limit) = limit {
        params.push(format!("limit={limit}"));
    }
    if let Some(offset) = offset {
        params.push(format!("offset={offset}"));
    }
    let mut path = format!("/api/v1/accounts/{}/transactions", account);
    if !params.is_empty() {
        path.push('?');
        path.push_str(&params.join("&"));
    }
    path
}

/// Decodes an error body. Validation failures list their fields in the message.
fn api_error(status: u16, body: &str) -> ClientError {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return ClientError::Api {
            status,
            code: "unknown".to_string(),
            message: body.to_string(),
        };
    };

    let code = json
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let message = match (json.get("message"), json.get("errors")) {
        (Some(Value::String(m)), _) => m.clone(),
        (_, Some(Value::Array(errors))) => errors
            .iter()
            .map(|e| {
                format!(
                    "{}: {}",
                    e.get("field").and_then(Value::as_str).unwrap_or("?"),
                    e.get("message").and_then(Value::as_str).unwrap_or("invalid"),
                )
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.to_string(),
    };
    ClientError::Api {
        status,
        code,
        message,
    }
}
