//! Transfer lifecycle reporting.

use std::time::Duration;

use ledger_types::{AccountId, LedgerError, NewTransfer, StoreError, Transaction};

use super::transfers::TransferError;

/// Receives lifecycle events from the transfer engine.
///
/// Every method has an empty default, so implementors only override what they
/// care about. Observers must not block; the engine calls them inline.
pub trait TransferObserver: Send + Sync + 'static {
    /// Input rejected before any store access.
    fn rejected(&self, _source: AccountId, _destination: AccountId, _error: &LedgerError) {}

    fn attempt_started(&self, _transfer: &NewTransfer, _attempt: u32) {}

    fn backing_off(&self, _transfer: &NewTransfer, _attempt: u32, _delay: Duration) {}

    /// An attempt failed with an error that will be retried if attempts remain.
    fn retryable_failure(&self, _transfer: &NewTransfer, _attempt: u32, _error: &LedgerError) {}

    /// Rolling back a failed attempt itself failed. Never surfaced to callers.
    fn rollback_failed(&self, _transfer: &NewTransfer, _error: &StoreError) {}

    fn succeeded(&self, _transaction: &Transaction, _attempts: u32) {}

    fn failed(&self, _transfer: &NewTransfer, _attempts: u32, _error: &LedgerError) {}

    fn cancelled(&self, _transfer: &NewTransfer, _reason: &TransferError) {}
}

/// Default observer: structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TransferObserver for TracingObserver {
    fn rejected(&self, source: AccountId, destination: AccountId, error: &LedgerError) {
        tracing::debug!(%source, %destination, error = %error, "transfer rejected");
    }

    fn attempt_started(&self, transfer: &NewTransfer, attempt: u32) {
        tracing::trace!(
            source = %transfer.source(),
            destination = %transfer.destination(),
            attempt,
            "transfer attempt"
        );
    }

    fn backing_off(&self, transfer: &NewTransfer, attempt: u32, delay: Duration) {
        tracing::debug!(
            source = %transfer.source(),
            destination = %transfer.destination(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            "retrying transfer after backoff"
        );
    }

    fn retryable_failure(&self, transfer: &NewTransfer, attempt: u32, error: &LedgerError) {
        tracing::warn!(
            source = %transfer.source(),
            destination = %transfer.destination(),
            attempt,
            error = %error,
            "retryable transfer failure"
        );
    }

    fn rollback_failed(&self, transfer: &NewTransfer, error: &StoreError) {
        tracing::error!(
            source = %transfer.source(),
            destination = %transfer.destination(),
            error = %error,
            "rollback failed"
        );
    }

    fn succeeded(&self, transaction: &Transaction, attempts: u32) {
        tracing::info!(
            transaction_id = %transaction.id,
            source = %transaction.source_account_id,
            destination = %transaction.destination_account_id,
            amount = %transaction.amount,
            attempts,
            "transfer completed"
        );
    }

    fn failed(&self, transfer: &NewTransfer, attempts: u32, error: &LedgerError) {
        if error.kind().is_infrastructure() {
            tracing::error!(
                source = %transfer.source(),
                destination = %transfer.destination(),
                attempts,
                error = %error,
                "transfer failed"
            );
        } else {
            tracing::info!(
                source = %transfer.source(),
                destination = %transfer.destination(),
                attempts,
                code = error.kind().code(),
                "transfer declined"
            );
        }
    }

    fn cancelled(&self, transfer: &NewTransfer, reason: &TransferError) {
        tracing::info!(
            source = %transfer.source(),
            destination = %transfer.destination(),
            reason = %reason,
            "transfer abandoned"
        );
    }
}
