//! Request body validation.
//!
//! Runs before any service call and reports every invalid field at once.

use ledger_types::{AccountId, CreateAccountRequest, CreateTransactionRequest, FieldError, Money};

fn field(name: &str, message: &str) -> FieldError {
    FieldError {
        field: name.to_string(),
        message: message.to_string(),
    }
}

fn positive_id(errors: &mut Vec<FieldError>, name: &str, raw: i64) -> Option<AccountId> {
    let id = AccountId::new(raw);
    if id.is_none() {
        errors.push(field(name, "must be a positive integer"));
    }
    id
}

fn decimal(errors: &mut Vec<FieldError>, name: &str, raw: &str) -> Option<Money> {
    if raw.is_empty() {
        errors.push(field(name, "is required"));
        return None;
    }
    match Money::parse(raw) {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(field(name, "must be a valid decimal number"));
            None
        }
    }
}

/// Returns the typed account id when the request is acceptable.
pub fn validate_create_account(req: &CreateAccountRequest) -> Result<AccountId, Vec<FieldError>> {
    let mut errors = Vec::new();

    let id = positive_id(&mut errors, "account_id", req.account_id);
    if let Some(balance) = decimal(&mut errors, "initial_balance", &req.initial_balance) {
        if !balance.is_non_negative() {
            errors.push(field("initial_balance", "cannot be negative"));
        }
    }

    match id {
        Some(id) if errors.is_empty() => Ok(id),
        _ => Err(errors),
    }
}

/// Returns the typed `(source, destination)` pair when the request is acceptable.
pub fn validate_create_transaction(
    req: &CreateTransactionRequest,
) -> Result<(AccountId, AccountId), Vec<FieldError>> {
    let mut errors = Vec::new();

    let source = positive_id(&mut errors, "source_account_id", req.source_account_id);
    let destination = positive_id(
        &mut errors,
        "destination_account_id",
        req.destination_account_id,
    );
    if let (Some(s), Some(d)) = (source, destination) {
        if s == d {
            errors.push(field(
                "destination_account_id",
                "cannot be the same as source_account_id",
            ));
        }
    }
    if let Some(amount) = decimal(&mut errors, "amount", &req.amount) {
        if !amount.is_positive() {
            errors.push(field("amount", "must be greater than zero"));
        }
    }

    match (source, destination) {
        (Some(s), Some(d)) if errors.is_empty() => Ok((s, d)),
        _ => Err(errors),
    }
}
