//! Domain Error Types
//!
//! Errors surfaced by the ledger operations, independent of transport.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

/// Ledger-level errors
///
/// Validation failures are raised before any store interaction; store
/// failures are raised only after the atomic unit has been rolled back.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    /// Non-positive amount/quantity, malformed product code, self-purchase
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Account already exists: {0}")]
    AccountExists(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    /// Invoice number already taken
    #[error("Invoice conflict: {invoice}")]
    Conflict { invoice: String },

    /// The atomic unit could not commit; nothing was applied
    #[error("Store failure: {0}")]
    StoreFailure(String),
}

impl LedgerError {
    pub fn insufficient_balance(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientBalance {
            required,
            available,
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Check if this is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::AccountNotFound(_)
                | Self::ProductNotFound(_)
                | Self::AccountExists(_)
                | Self::InsufficientBalance { .. }
        )
    }

    /// Check if the operation may succeed when recomputed
    pub fn is_conflict_error(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(invoice) => Self::Conflict { invoice },
            StoreError::DuplicateAccount(owner) => Self::AccountExists(owner),
            other => Self::StoreFailure(other.to_string()),
        }
    }
}

impl From<super::AmountError> for LedgerError {
    fn from(err: super::AmountError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
