//! Command Handlers module
//!
//! Handlers validate a command, run it inside one atomic unit of the store
//! and commit or roll back the whole unit. Queries read committed state only.

mod account_handler;
mod commands;
mod purchase_handler;
mod query_handler;
mod topup_handler;


use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};

use crate::domain::{Account, LedgerError};
use crate::store::AtomicUnit;

pub use account_handler::OpenAccountHandler;
pub use commands::*;
pub use purchase_handler::PurchaseHandler;
pub use query_handler::QueryHandler;
pub use topup_handler::TopupHandler;

/// Source of "now" for order timestamps and invoice days
pub type Clock = fn() -> DateTime<Utc>;

/// Attempts per operation when the computed invoice is already taken
const MAX_ATTEMPTS: u32 = 2;

/// Pause before recomputing an invoice after a conflict
const RETRY_BACKOFF: Duration = Duration::from_millis(5);

/// Current time at the precision the store keeps (microseconds)
pub(crate) fn current_time(clock: Clock) -> DateTime<Utc> {
    clock().trunc_subsecs(6)
}

/// Lock an account row by owner, failing if the account does not exist
pub(crate) async fn lock_existing(
    unit: &mut dyn AtomicUnit,
    owner: &str,
) -> Result<Account, LedgerError> {
    unit.lock_account(owner)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(owner.to_string()))
}

/// Roll back a failed unit and hand back the error that caused it
pub(crate) async fn abort_unit(unit: Box<dyn AtomicUnit>, err: LedgerError) -> LedgerError {
    if let Err(rollback_err) = unit.rollback().await {
        tracing::warn!(error = %rollback_err, "Rollback failed; the unit is discarded on drop");
    }
    err
}

/// Run `attempt` again when it fails on an invoice conflict.
///
/// Every attempt opens a fresh unit, so the invoice is recomputed from the
/// orders committed in the meantime.
pub(crate) async fn retry_on_invoice_conflict<T, F, Fut>(
    operation: &str,
    mut attempt: F,
) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Err(e) if e.is_conflict_error() && tries < MAX_ATTEMPTS => {
                tracing::warn!(
                    operation = operation,
                    attempt = tries,
                    error = %e,
                    "Invoice conflict, retrying"
                );
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            result => return result,
        }
    }
}
