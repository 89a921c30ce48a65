//! Store module
//!
//! Persistence boundary of the ledger. The handlers never touch storage
//! directly: they open an [`AtomicUnit`], lock the account rows they mutate,
//! and commit or roll back the whole unit.

mod error;
mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{Account, Balance, NewOrder, Order, Product};

pub use error::StoreError;
pub use memory::{Fault, InMemoryLedgerStore};
pub use postgres::PgLedgerStore;

/// Accounts and orders, with transactional scopes
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a new atomic unit
    async fn begin(&self) -> Result<Box<dyn AtomicUnit>, StoreError>;

    /// Committed view of an account
    async fn get_account(&self, owner: &str) -> Result<Option<Account>, StoreError>;

    /// Create an account with a zero balance
    async fn create_account(&self, owner: &str) -> Result<Account, StoreError>;

    /// All orders of an account, newest first
    async fn list_orders(&self, account_id: i64) -> Result<Vec<Order>, StoreError>;
}

/// A group of mutations that commit or abort together.
///
/// Dropping a unit without calling [`AtomicUnit::commit`] discards every
/// change made through it and releases its row locks.
#[async_trait]
pub trait AtomicUnit: Send {
    /// Lock the account row for the rest of the unit and return it
    async fn lock_account(&mut self, owner: &str) -> Result<Option<Account>, StoreError>;

    /// Add `delta` to the balance, returning the new balance
    async fn adjust_balance(&mut self, account_id: i64, delta: Decimal) -> Result<Balance, StoreError>;

    /// Number of orders of the account created at or after `since`
    async fn count_orders_since(
        &mut self,
        account_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Insert an order; fails with `UniqueViolation` if the invoice is taken
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Read-only product lookup
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn by_code(&self, code: &str) -> Result<Option<Product>, StoreError>;

    async fn list(&self) -> Result<Vec<Product>, StoreError>;
}
