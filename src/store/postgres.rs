//! PostgreSQL Store
//!
//! `LedgerStore` on top of sqlx. Each atomic unit is one database
//! transaction; account rows are locked with `SELECT ... FOR UPDATE` and the
//! `(account_id, invoice)` unique index rejects duplicate invoice numbers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;

use crate::domain::{Account, Amount, Balance, NewOrder, Order, OrderKind, Product};

use super::{AtomicUnit, LedgerStore, ProductCatalog, StoreError};

type AccountRow = (i64, String, Decimal, DateTime<Utc>);

type OrderRow = (
    i64,
    String,
    i64,
    Option<String>,
    Option<String>,
    Decimal,
    String,
    Option<String>,
    DateTime<Utc>,
);

type ProductRow = (String, String, Decimal, Option<Decimal>, String);

/// PostgreSQL-backed ledger store
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Abort units that wait longer than `timeout` for a row lock
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn AtomicUnit>, StoreError> {
        let mut tx = self.pool.begin().await?;

        if let Some(timeout) = self.lock_timeout {
            // SET does not take bind parameters
            sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis()))
                .execute(&mut *tx)
                .await?;
        }

        Ok(Box::new(PgAtomicUnit { tx }))
    }

    async fn get_account(&self, owner: &str) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, owner, balance, created_at
            FROM accounts
            WHERE owner = $1
            "#,
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn create_account(&self, owner: &str) -> Result<Account, StoreError> {
        let row: AccountRow = sqlx::query_as(
            r#"
            INSERT INTO accounts (owner, balance)
            VALUES ($1, 0)
            RETURNING id, owner, balance, created_at
            "#,
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateAccount(owner.to_string())
            }
            _ => StoreError::Database(e),
        })?;

        account_from_row(row)
    }

    async fn list_orders(&self, account_id: i64) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, invoice, account_id, merchant, buyer, amount, type, description, created_at
            FROM orders
            WHERE account_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(order_from_row).collect()
    }
}

#[async_trait]
impl ProductCatalog for PgLedgerStore {
    async fn by_code(&self, code: &str) -> Result<Option<Product>, StoreError> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT code, name, price, weight, merchant
            FROM products
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(product_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT code, name, price, weight, merchant
            FROM products
            ORDER BY code ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(product_from_row).collect()
    }
}

/// One database transaction. Dropping it without commit rolls it back.
pub struct PgAtomicUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AtomicUnit for PgAtomicUnit {
    async fn lock_account(&mut self, owner: &str) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, owner, balance, created_at
            FROM accounts
            WHERE owner = $1
            FOR UPDATE
            "#,
        )
        .bind(owner)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn adjust_balance(&mut self, account_id: i64, delta: Decimal) -> Result<Balance, StoreError> {
        let balance: Option<Decimal> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET balance = balance + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING balance
            "#,
        )
        .bind(account_id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_check_violation() => {
                StoreError::Constraint(db.message().to_string())
            }
            _ => StoreError::Database(e),
        })?;

        let balance = balance.ok_or_else(|| StoreError::RowNotFound(format!("account {}", account_id)))?;
        Balance::new(balance).map_err(|e| StoreError::InvalidData(e.to_string()))
    }

    async fn count_orders_since(
        &mut self,
        account_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE account_id = $1 AND created_at >= $2
            "#,
        )
        .bind(account_id)
        .bind(since)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (
                invoice, account_id, merchant, buyer,
                amount, type, description, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&order.invoice)
        .bind(order.account_id)
        .bind(&order.merchant)
        .bind(&order.buyer)
        .bind(order.amount.value())
        .bind(order.kind.as_str())
        .bind(&order.description)
        .bind(order.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::UniqueViolation(order.invoice.clone())
            }
            _ => StoreError::Database(e),
        })?;

        Ok(order.into_order(id))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn account_from_row((id, owner, balance, created_at): AccountRow) -> Result<Account, StoreError> {
    let balance = Balance::new(balance).map_err(|e| StoreError::InvalidData(e.to_string()))?;
    Ok(Account {
        id,
        owner,
        balance,
        created_at,
    })
}

fn order_from_row(
    (id, invoice, account_id, merchant, buyer, amount, kind, description, created_at): OrderRow,
) -> Result<Order, StoreError> {
    let amount = Amount::new(amount).map_err(|e| StoreError::InvalidData(e.to_string()))?;
    let kind: OrderKind = kind.parse().map_err(StoreError::InvalidData)?;
    Ok(Order {
        id,
        invoice,
        account_id,
        merchant,
        buyer,
        amount,
        kind,
        description,
        created_at,
    })
}

fn product_from_row((code, name, price, weight, merchant): ProductRow) -> Result<Product, StoreError> {
    let price = Amount::new(price).map_err(|e| StoreError::InvalidData(e.to_string()))?;
    Ok(Product {
        code,
        name,
        price,
        weight,
        merchant,
    })
}
