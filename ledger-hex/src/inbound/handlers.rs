//! HTTP request handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{
        Path, Query, Request, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use tokio_util::sync::CancellationToken;

use ledger_types::{
    AccountId, AccountResponse, CreateAccountRequest, CreateTransactionRequest, ErrorKind,
    ErrorResponse, FieldError, HealthResponse, LedgerError, LedgerStore, ReadyChecks,
    ReadyResponse, TransactionId, TransactionListQuery, TransactionResponse,
    ValidationErrorResponse,
};

use super::validation::{validate_create_account, validate_create_transaction};
use crate::service::{
    AccountService, CallerContext, TransferConfig, TransferEngine, TransferError, TransferObserver,
};

pub const SERVICE_NAME: &str = "ledger-transfers";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const READY_TIMEOUT: Duration = Duration::from_secs(2);
pub(crate) const INTERNAL_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

/// Application state shared across handlers.
pub struct AppState<S: LedgerStore> {
    pub accounts: AccountService<S>,
    pub transfers: TransferEngine<S>,
    pub store: Arc<S>,
    /// Deadline applied to each transfer request.
    pub request_timeout: Duration,
    /// Cancelled when the server begins shutting down.
    pub shutdown: CancellationToken,
}

impl<S: LedgerStore> AppState<S> {
    pub fn new(store: Arc<S>, config: TransferConfig) -> Self {
        Self {
            accounts: AccountService::new(Arc::clone(&store)),
            transfers: TransferEngine::new(Arc::clone(&store), config),
            store,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.transfers = self.transfers.with_observer(observer);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Every way a request can fail, mapped to status and body in `into_response`.
#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    Validation(Vec<FieldError>),
    InvalidJson(String),
    InvalidQuery(String),
    InvalidId(String),
    Cancelled,
    Timeout,
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Ledger(e) => ApiError::Ledger(e),
            TransferError::Cancelled => ApiError::Cancelled,
            TransferError::DeadlineExceeded => ApiError::Timeout,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidJson(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidQuery(rejection.body_text())
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidAmount | ErrorKind::SameAccount => StatusCode::BAD_REQUEST,
        ErrorKind::AccountNotFound | ErrorKind::TransferNotFound => StatusCode::NOT_FOUND,
        ErrorKind::AccountAlreadyExists | ErrorKind::DuplicateTransaction => StatusCode::CONFLICT,
        ErrorKind::InsufficientBalance => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::DatabaseError | ErrorKind::TransactionFailed | ErrorKind::InternalError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Builds an error response. The body is also stashed in the response
/// extensions so `attach_request_id` can stamp the request id into it.
pub(crate) fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: code.to_string(),
        message: message.to_string(),
        request_id: None,
    };
    let mut response = (status, Json(body.clone())).into_response();
    response.extensions_mut().insert(body);
    response
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Ledger(err) if err.kind().is_infrastructure() => {
                tracing::error!(error = %err, "request failed");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorKind::InternalError.code(),
                    INTERNAL_MESSAGE,
                )
            }
            ApiError::Ledger(err) => {
                error_response(status_for(err.kind()), err.kind().code(), err.message())
            }
            ApiError::Validation(errors) => {
                let body = ValidationErrorResponse {
                    success: false,
                    error: "validation_failed".to_string(),
                    errors,
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::InvalidJson(detail) => {
                tracing::debug!(%detail, "rejected request body");
                error_response(StatusCode::BAD_REQUEST, "invalid_json", "Invalid JSON body")
            }
            ApiError::InvalidQuery(detail) => error_response(
                StatusCode::BAD_REQUEST,
                "invalid_query",
                &format!("Invalid query string: {}", detail),
            ),
            ApiError::InvalidId(raw) => error_response(
                StatusCode::BAD_REQUEST,
                "invalid_id",
                &format!("invalid id {:?}: must be a positive integer", raw),
            ),
            ApiError::Cancelled => error_response(
                StatusCode::BAD_REQUEST,
                "request_cancelled",
                "request was cancelled",
            ),
            ApiError::Timeout => error_response(
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                "request timed out",
            ),
        }
    }
}

/// Copies the `X-Request-ID` header into error bodies produced further in.
pub async fn attach_request_id(req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let mut response = next.run(req).await;
    match (request_id, response.extensions_mut().remove::<ErrorResponse>()) {
        (Some(id), Some(mut body)) => {
            body.request_id = Some(id);
            (response.status(), Json(body)).into_response()
        }
        _ => response,
    }
}

fn parse_id<T: std::str::FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.parse().map_err(|_| ApiError::InvalidId(raw.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Probes
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness: answers as long as the process is serving.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

/// Readiness: the store must answer a ping within two seconds.
pub async fn ready<S: LedgerStore>(State(state): State<Arc<AppState<S>>>) -> Response {
    let ping = tokio::time::timeout(READY_TIMEOUT, state.store.ping()).await;
    match ping {
        Ok(Ok(())) => Json(ReadyResponse {
            status: "ready".to_string(),
            checks: ReadyChecks {
                database: "ok".to_string(),
            },
        })
        .into_response(),
        failed => {
            match failed {
                Ok(Err(e)) => tracing::warn!(error = %e, "readiness check failed"),
                _ => tracing::warn!("readiness check timed out"),
            }
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    status: "not_ready".to_string(),
                    checks: ReadyChecks {
                        database: "unavailable".to_string(),
                    },
                }),
            )
                .into_response()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, body))]
pub async fn create_account<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let id = validate_create_account(&req).map_err(ApiError::Validation)?;

    let account = state
        .accounts
        .create_account(id, &req.initial_balance)
        .await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(&account))))
}

/// Get account by ID.
#[tracing::instrument(skip(state), fields(account_id = %id))]
pub async fn get_account<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id: AccountId = parse_id(&id)?;

    let account = state.accounts.get_account(account_id).await?;
    Ok(Json(AccountResponse::from(&account)))
}

/// List transfers touching an account, newest first.
#[tracing::instrument(skip(state, query), fields(account_id = %id))]
pub async fn list_transactions<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    query: Result<Query<TransactionListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id: AccountId = parse_id(&id)?;
    let Query(query) = query?;

    // Unknown accounts are a 404, not an empty page.
    state.accounts.get_account(account_id).await?;

    let transactions = state
        .transfers
        .list_account_transactions(account_id, query.limit, query.offset)
        .await?;
    let body: Vec<TransactionResponse> = transactions.iter().map(Into::into).collect();
    Ok(Json(body))
}

// ─────────────────────────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────────────────────────

/// Transfer money between accounts.
#[tracing::instrument(skip(state, body))]
pub async fn create_transaction<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (source, destination) =
        validate_create_transaction(&req).map_err(ApiError::Validation)?;

    let ctx = CallerContext::new(state.shutdown.child_token()).with_timeout(state.request_timeout);
    let tx = state
        .transfers
        .transfer(source, destination, &req.amount, &ctx)
        .await?;
    Ok((StatusCode::CREATED, Json(TransactionResponse::from(&tx))))
}

/// Get a recorded transfer by ID.
#[tracing::instrument(skip(state), fields(transaction_id = %id))]
pub async fn get_transaction<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction_id: TransactionId = parse_id(&id)?;

    let tx = state.transfers.get_transaction(transaction_id).await?;
    Ok(Json(TransactionResponse::from(&tx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_types::StoreError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::InvalidAmount), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::SameAccount), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::AccountNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::AccountAlreadyExists), StatusCode::CONFLICT);
        assert_eq!(
            status_for(ErrorKind::InsufficientBalance),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(ErrorKind::TransactionFailed),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_infrastructure_errors_are_masked() {
        let err = LedgerError::wrap(
            ErrorKind::DatabaseError,
            "failed to lock account 1",
            StoreError::Database("relation \"accounts\" does not exist".into()),
        );
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.extensions().get::<ErrorResponse>().unwrap();
        assert_eq!(body.error, "internal_error");
        assert_eq!(body.message, INTERNAL_MESSAGE);
    }

    #[test]
    fn test_cancellation_outcomes() {
        assert_eq!(
            ApiError::from(TransferError::Cancelled).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(TransferError::DeadlineExceeded)
                .into_response()
                .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
