//! Command definitions
//!
//! Commands represent intentions to change the ledger. Each command
//! validates itself before any store interaction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Amount, LedgerError};

/// Longest accepted username or product code
const MAX_IDENTIFIER_LEN: usize = 64;

// =========================================================================
// OpenAccountCommand
// =========================================================================

/// Command to open the (single) account of a newly registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountCommand {
    pub username: String,
}

impl OpenAccountCommand {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_username(&self.username)
    }
}

// =========================================================================
// TopupCommand
// =========================================================================

/// Command to increase a user's balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopupCommand {
    pub username: String,
    /// Amount to add (as string for precise decimal)
    pub amount: String,
}

impl TopupCommand {
    pub fn new(username: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            amount: amount.into(),
        }
    }

    /// Parse and validate, returning the amount to credit
    pub fn validate(&self) -> Result<Amount, LedgerError> {
        validate_username(&self.username)?;
        self.amount
            .parse()
            .map_err(|e| LedgerError::invalid_input(format!("Invalid amount: {}", e)))
    }
}

// =========================================================================
// PurchaseCommand
// =========================================================================

/// Command to buy `quantity` units of a product from its merchant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseCommand {
    pub username: String,
    pub product_code: String,
    pub quantity: i64,
}

impl PurchaseCommand {
    pub fn new(username: impl Into<String>, product_code: impl Into<String>, quantity: i64) -> Self {
        Self {
            username: username.into(),
            product_code: product_code.into(),
            quantity,
        }
    }

    /// Validate, returning the normalized product code and quantity
    pub fn validate(&self) -> Result<(String, u32), LedgerError> {
        validate_username(&self.username)?;
        let code = normalize_product_code(&self.product_code)?;

        if self.quantity <= 0 {
            return Err(LedgerError::invalid_input(format!(
                "Quantity must be positive (got {})",
                self.quantity
            )));
        }
        let quantity = u32::try_from(self.quantity)
            .map_err(|_| LedgerError::invalid_input("Quantity is too large"))?;

        Ok((code, quantity))
    }
}

/// Product codes are stored upper-case; lookups are case-insensitive
pub fn normalize_product_code(code: &str) -> Result<String, LedgerError> {
    let code = code.trim();
    if code.is_empty() || code.len() > MAX_IDENTIFIER_LEN {
        return Err(LedgerError::invalid_input("Malformed product code"));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(LedgerError::invalid_input(format!(
            "Malformed product code: {}",
            code
        )));
    }
    Ok(code.to_ascii_uppercase())
}

fn validate_username(username: &str) -> Result<(), LedgerError> {
    if username.trim().is_empty() {
        return Err(LedgerError::invalid_input("Username must not be empty"));
    }
    if username.len() > MAX_IDENTIFIER_LEN {
        return Err(LedgerError::invalid_input("Username is too long"));
    }
    Ok(())
}

/// Result of a ledger consistency check for one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub owner: String,
    /// Balance stored on the account row
    pub recorded: Decimal,
    /// Sum of signed ledger entries
    pub computed: Decimal,
    pub entries: usize,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.recorded == self.computed
    }
}
