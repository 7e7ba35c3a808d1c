//! OpenAPI document and Swagger UI wiring.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use ledger_types::dto::{
    AccountResponse, CreateAccountRequest, CreateTransactionRequest, ErrorResponse, FieldError,
    HealthResponse, ReadyChecks, ReadyResponse, TransactionListQuery, TransactionResponse,
    ValidationErrorResponse,
};
use ledger_types::{AccountId, TransactionId};
use utoipa::OpenApi;

// Documentation stand-ins for the generic handlers in `inbound::handlers`.

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
async fn health() {}

/// Readiness probe; pings the database
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Database reachable", body = ReadyResponse),
        (status = 503, description = "Database unreachable", body = ReadyResponse)
    )
)]
async fn ready() {}

/// Open an account with a caller-chosen id
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    tag = "accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 400, description = "Invalid request", body = ValidationErrorResponse),
        (status = 409, description = "Account id already taken", body = ErrorResponse)
    )
)]
async fn create_account() {}

/// Get account by ID
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    tag = "accounts",
    params(
        ("id" = i64, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Account details", body = AccountResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
async fn get_account() {}

/// Transfers touching an account, newest first
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}/transactions",
    tag = "accounts",
    params(
        ("id" = i64, Path, description = "Account ID"),
        TransactionListQuery
    ),
    responses(
        (status = 200, description = "One page of transfers", body = Vec<TransactionResponse>),
        (status = 400, description = "Malformed id or paging parameters", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
async fn list_transactions() {}

/// Move money between two accounts
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    tag = "transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transfer committed", body = TransactionResponse),
        (status = 400, description = "Invalid request", body = ValidationErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 422, description = "Insufficient balance", body = ErrorResponse),
        (status = 500, description = "Transfer failed after retries", body = ErrorResponse),
        (status = 504, description = "Request deadline exceeded", body = ErrorResponse)
    )
)]
async fn create_transaction() {}

/// Get a recorded transfer by ID
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{id}",
    tag = "transactions",
    params(
        ("id" = i64, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transfer details", body = TransactionResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
async fn get_transaction() {}

/// OpenAPI documentation for the Ledger API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ledger Transfer Service API",
        version = "1.0.0",
        description = "Accounts holding decimal balances and atomic transfers between them.\n\nAmounts travel as decimal strings (`\"100.25\"`) and are never rounded.",
        license(name = "MIT"),
    ),
    paths(
        health,
        ready,
        create_account,
        get_account,
        list_transactions,
        create_transaction,
        get_transaction,
    ),
    components(
        schemas(
            CreateAccountRequest,
            AccountResponse,
            CreateTransactionRequest,
            TransactionResponse,
            ErrorResponse,
            FieldError,
            ValidationErrorResponse,
            HealthResponse,
            ReadyChecks,
            ReadyResponse,
            AccountId,
            TransactionId,
        )
    ),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "accounts", description = "Account opening and lookup"),
        (name = "transactions", description = "Transfers between accounts"),
    )
)]
pub struct ApiDoc;
