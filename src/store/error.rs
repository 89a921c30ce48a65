//! Store Errors
//!
//! Error types for ledger persistence.

/// Errors that can occur in a ledger store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Invoice number already taken
    #[error("Unique violation on invoice {0}")]
    UniqueViolation(String),

    /// Account owner already registered
    #[error("Account already exists: {0}")]
    DuplicateAccount(String),

    /// A row-level constraint rejected the write (e.g. negative balance)
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// Row referenced by id does not exist
    #[error("Row not found: {0}")]
    RowNotFound(String),

    /// Stored data could not be decoded
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Store could not be reached or the unit was already closed
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Check if recomputing the unit may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}
