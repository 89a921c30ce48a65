//! Ledger records
//!
//! Accounts, products and the immutable orders (ledger entries) that move
//! money between them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Amount, Balance};

/// Kind of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Balance increase with no counterparty
    Topup,
    /// Buyer side of a purchase
    Payment,
    /// Merchant side of a purchase
    Revenue,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Topup => "TOPUP",
            OrderKind::Payment => "PAYMENT",
            OrderKind::Revenue => "REVENUE",
        }
    }

    /// Whether this kind of entry increases the owning account's balance
    pub fn is_credit(&self) -> bool {
        match self {
            OrderKind::Topup | OrderKind::Revenue => true,
            OrderKind::Payment => false,
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TOPUP" => Ok(OrderKind::Topup),
            "PAYMENT" => Ok(OrderKind::Payment),
            "REVENUE" => Ok(OrderKind::Revenue),
            _ => Err(format!("Invalid order kind: {}", s)),
        }
    }
}

/// A balance holder, one per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub owner: String,
    pub balance: Balance,
    pub created_at: DateTime<Utc>,
}

/// Catalog entry, consumed read-only to price purchases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub code: String,
    pub name: String,
    pub price: Amount,
    #[serde(default)]
    pub weight: Option<Decimal>,
    pub merchant: String,
}

/// An order as it is handed to the store for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub invoice: String,
    pub account_id: i64,
    pub merchant: Option<String>,
    pub buyer: Option<String>,
    pub amount: Amount,
    pub kind: OrderKind,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn topup(account_id: i64, invoice: String, amount: Amount, created_at: DateTime<Utc>) -> Self {
        Self {
            invoice,
            account_id,
            merchant: None,
            buyer: None,
            amount,
            kind: OrderKind::Topup,
            description: None,
            created_at,
        }
    }

    /// One leg of a purchase; `kind` is `Payment` for the buyer, `Revenue` for the merchant.
    pub fn purchase_leg(
        kind: OrderKind,
        account_id: i64,
        invoice: String,
        amount: Amount,
        product: &Product,
        buyer: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            invoice,
            account_id,
            merchant: Some(product.merchant.clone()),
            buyer: Some(buyer.to_string()),
            amount,
            kind,
            description: Some(format!("Payment for product {}({})", product.name, product.code)),
            created_at,
        }
    }

    /// Attach the store-assigned id
    pub fn into_order(self, id: i64) -> Order {
        Order {
            id,
            invoice: self.invoice,
            account_id: self.account_id,
            merchant: self.merchant,
            buyer: self.buyer,
            amount: self.amount,
            kind: self.kind,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub invoice: String,
    pub account_id: i64,
    pub merchant: Option<String>,
    pub buyer: Option<String>,
    pub amount: Amount,
    #[serde(rename = "type")]
    pub kind: OrderKind,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// The entry's effect on its account's balance
    pub fn signed_amount(&self) -> Decimal {
        if self.kind.is_credit() {
            self.amount.value()
        } else {
            -self.amount.value()
        }
    }
}
