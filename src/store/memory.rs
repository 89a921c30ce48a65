//! In-memory Store
//!
//! A thread-safe `LedgerStore` for tests and local runs. Account rows are
//! guarded by per-account async mutexes held for the lifetime of a unit;
//! writes are staged in the unit and applied in one critical section on
//! commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{Account, Balance, NewOrder, Order, Product};

use super::{AtomicUnit, LedgerStore, ProductCatalog, StoreError};

/// Failure to inject into the next matching store call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Next `insert_order` reports the invoice as taken
    InvoiceConflict,
    /// Next `insert_order` fails as if the connection dropped
    InsertFailure,
    /// Next `commit` fails
    CommitFailure,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<i64, Account>,
    owners: HashMap<String, i64>,
    row_locks: HashMap<i64, Arc<Mutex<()>>>,
    orders: Vec<Order>,
    products: HashMap<String, Product>,
    faults: VecDeque<Fault>,
    next_account_id: i64,
    next_order_id: i64,
}

impl MemoryState {
    fn take_fault(&mut self, wanted: &[Fault]) -> Option<Fault> {
        match self.faults.front() {
            Some(fault) if wanted.contains(fault) => self.faults.pop_front(),
            _ => None,
        }
    }

    fn invoice_taken(&self, account_id: i64, invoice: &str) -> bool {
        self.orders
            .iter()
            .any(|o| o.account_id == account_id && o.invoice == invoice)
    }
}

/// In-memory ledger store
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a product in the catalog
    pub async fn add_product(&self, product: Product) {
        let mut state = self.state.lock().await;
        state.products.insert(product.code.clone(), product);
    }

    /// Queue a failure for the next matching call
    pub async fn inject_fault(&self, fault: Fault) {
        self.state.lock().await.faults.push_back(fault);
    }

    /// Total number of committed orders across all accounts
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn AtomicUnit>, StoreError> {
        Ok(Box::new(InMemoryAtomicUnit {
            state: Arc::clone(&self.state),
            locks: HashMap::new(),
            deltas: HashMap::new(),
            staged: Vec::new(),
        }))
    }

    async fn get_account(&self, owner: &str) -> Result<Option<Account>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .owners
            .get(owner)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn create_account(&self, owner: &str) -> Result<Account, StoreError> {
        let mut state = self.state.lock().await;
        if state.owners.contains_key(owner) {
            return Err(StoreError::DuplicateAccount(owner.to_string()));
        }

        state.next_account_id += 1;
        let account = Account {
            id: state.next_account_id,
            owner: owner.to_string(),
            balance: Balance::zero(),
            created_at: Utc::now(),
        };
        state.owners.insert(owner.to_string(), account.id);
        state.row_locks.insert(account.id, Arc::new(Mutex::new(())));
        state.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn list_orders(&self, account_id: i64) -> Result<Vec<Order>, StoreError> {
        let state = self.state.lock().await;
        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .filter(|o| o.account_id == account_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }
}

#[async_trait]
impl ProductCatalog for InMemoryLedgerStore {
    async fn by_code(&self, code: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.state.lock().await.products.get(code).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(products)
    }
}

/// Unit of work over the in-memory state
pub struct InMemoryAtomicUnit {
    state: Arc<Mutex<MemoryState>>,
    locks: HashMap<i64, OwnedMutexGuard<()>>,
    deltas: HashMap<i64, Decimal>,
    staged: Vec<Order>,
}

impl InMemoryAtomicUnit {
    /// Acquire the row lock for `account_id` unless this unit already holds it
    async fn ensure_locked(&mut self, account_id: i64) -> Result<(), StoreError> {
        if self.locks.contains_key(&account_id) {
            return Ok(());
        }

        let row_lock = {
            let state = self.state.lock().await;
            state
                .row_locks
                .get(&account_id)
                .cloned()
                .ok_or_else(|| StoreError::RowNotFound(format!("account {}", account_id)))?
        };

        let guard = row_lock.lock_owned().await;
        self.locks.insert(account_id, guard);
        Ok(())
    }

    fn pending_delta(&self, account_id: i64) -> Decimal {
        self.deltas.get(&account_id).copied().unwrap_or(Decimal::ZERO)
    }
}

#[async_trait]
impl AtomicUnit for InMemoryAtomicUnit {
    async fn lock_account(&mut self, owner: &str) -> Result<Option<Account>, StoreError> {
        let account_id = match self.state.lock().await.owners.get(owner) {
            Some(id) => *id,
            None => return Ok(None),
        };

        self.ensure_locked(account_id).await?;

        let state = self.state.lock().await;
        let Some(account) = state.accounts.get(&account_id) else {
            return Ok(None);
        };

        let balance = Balance::new(account.balance.value() + self.pending_delta(account_id))
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        Ok(Some(Account {
            balance,
            ..account.clone()
        }))
    }

    async fn adjust_balance(&mut self, account_id: i64, delta: Decimal) -> Result<Balance, StoreError> {
        self.ensure_locked(account_id).await?;

        let committed = {
            let state = self.state.lock().await;
            state
                .accounts
                .get(&account_id)
                .map(|a| a.balance.value())
                .ok_or_else(|| StoreError::RowNotFound(format!("account {}", account_id)))?
        };

        let pending = self.pending_delta(account_id) + delta;
        let balance = Balance::new(committed + pending)
            .map_err(|_| StoreError::Constraint("balance_non_negative".to_string()))?;

        self.deltas.insert(account_id, pending);
        Ok(balance)
    }

    async fn count_orders_since(
        &mut self,
        account_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        let count = state
            .orders
            .iter()
            .chain(self.staged.iter())
            .filter(|o| o.account_id == account_id && o.created_at >= since)
            .count();
        Ok(count as i64)
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        let mut state = self.state.lock().await;

        match state.take_fault(&[Fault::InvoiceConflict, Fault::InsertFailure]) {
            Some(Fault::InvoiceConflict) => return Err(StoreError::UniqueViolation(order.invoice)),
            Some(_) => return Err(StoreError::Unavailable("connection reset".to_string())),
            None => {}
        }

        if !state.accounts.contains_key(&order.account_id) {
            return Err(StoreError::RowNotFound(format!("account {}", order.account_id)));
        }

        let staged_dup = self
            .staged
            .iter()
            .any(|o| o.account_id == order.account_id && o.invoice == order.invoice);
        if staged_dup || state.invoice_taken(order.account_id, &order.invoice) {
            return Err(StoreError::UniqueViolation(order.invoice));
        }

        state.next_order_id += 1;
        let order = order.into_order(state.next_order_id);
        self.staged.push(order.clone());
        Ok(order)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        let mut state = this.state.lock().await;

        if state.take_fault(&[Fault::CommitFailure]).is_some() {
            return Err(StoreError::Unavailable("commit failed".to_string()));
        }

        if let Some(dup) = this
            .staged
            .iter()
            .find(|o| state.invoice_taken(o.account_id, &o.invoice))
        {
            return Err(StoreError::UniqueViolation(dup.invoice.clone()));
        }

        // validate every balance before touching any
        let mut updated = Vec::with_capacity(this.deltas.len());
        for (account_id, delta) in &this.deltas {
            let account = state
                .accounts
                .get(account_id)
                .ok_or_else(|| StoreError::RowNotFound(format!("account {}", account_id)))?;
            let balance = Balance::new(account.balance.value() + delta)
                .map_err(|_| StoreError::Constraint("balance_non_negative".to_string()))?;
            updated.push((*account_id, balance));
        }

        for (account_id, balance) in updated {
            if let Some(account) = state.accounts.get_mut(&account_id) {
                account.balance = balance;
            }
        }
        state.orders.extend(this.staged);

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, OrderKind};
    use rust_decimal_macros::dec;

    fn topup(account_id: i64, invoice: &str, amount: Decimal) -> NewOrder {
        NewOrder::topup(
            account_id,
            invoice.to_string(),
            Amount::new(amount).unwrap(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_create_account_starts_at_zero() {
        let store = InMemoryLedgerStore::new();
        let account = store.create_account("buyer01").await.unwrap();

        assert_eq!(account.balance, Balance::zero());
        assert!(matches!(
            store.create_account("buyer01").await,
            Err(StoreError::DuplicateAccount(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_applies_all_changes() {
        let store = InMemoryLedgerStore::new();
        let account = store.create_account("buyer01").await.unwrap();

        let mut unit = store.begin().await.unwrap();
        unit.lock_account("buyer01").await.unwrap().unwrap();
        unit.adjust_balance(account.id, dec!(50)).await.unwrap();
        unit.insert_order(topup(account.id, "INV18102026-0001", dec!(50)))
            .await
            .unwrap();
        unit.commit().await.unwrap();

        let account = store.get_account("buyer01").await.unwrap().unwrap();
        assert_eq!(account.balance.value(), dec!(50));
        assert_eq!(store.list_orders(account.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_unit_leaves_no_trace() {
        let store = InMemoryLedgerStore::new();
        let account = store.create_account("buyer01").await.unwrap();

        {
            let mut unit = store.begin().await.unwrap();
            unit.adjust_balance(account.id, dec!(50)).await.unwrap();
            unit.insert_order(topup(account.id, "INV18102026-0001", dec!(50)))
                .await
                .unwrap();
        }

        let account = store.get_account("buyer01").await.unwrap().unwrap();
        assert_eq!(account.balance, Balance::zero());
        assert_eq!(store.order_count().await, 0);

        // the row lock was released with the unit
        let mut unit = store.begin().await.unwrap();
        assert!(unit.lock_account("buyer01").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_negative_balance_rejected() {
        let store = InMemoryLedgerStore::new();
        let account = store.create_account("buyer01").await.unwrap();

        let mut unit = store.begin().await.unwrap();
        assert!(matches!(
            unit.adjust_balance(account.id, dec!(-1)).await,
            Err(StoreError::Constraint(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_invoice_rejected() {
        let store = InMemoryLedgerStore::new();
        let account = store.create_account("buyer01").await.unwrap();

        let mut unit = store.begin().await.unwrap();
        unit.insert_order(topup(account.id, "INV18102026-0001", dec!(1)))
            .await
            .unwrap();
        unit.commit().await.unwrap();

        let mut unit = store.begin().await.unwrap();
        let err = unit
            .insert_order(topup(account.id, "INV18102026-0001", dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(inv) if inv == "INV18102026-0001"));
    }

    #[tokio::test]
    async fn test_same_invoice_on_different_accounts_allowed() {
        let store = InMemoryLedgerStore::new();
        let a = store.create_account("buyer01").await.unwrap();
        let b = store.create_account("merchant01").await.unwrap();

        let mut unit = store.begin().await.unwrap();
        unit.insert_order(topup(a.id, "INV18102026-0001", dec!(1)))
            .await
            .unwrap();
        unit.insert_order(topup(b.id, "INV18102026-0001", dec!(1)))
            .await
            .unwrap();
        unit.commit().await.unwrap();

        assert_eq!(store.order_count().await, 2);
    }

    #[tokio::test]
    async fn test_count_includes_staged_orders() {
        let store = InMemoryLedgerStore::new();
        let account = store.create_account("buyer01").await.unwrap();
        let since = Utc::now() - chrono::Duration::hours(1);

        let mut unit = store.begin().await.unwrap();
        unit.insert_order(topup(account.id, "INV18102026-0001", dec!(1)))
            .await
            .unwrap();
        assert_eq!(unit.count_orders_since(account.id, since).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_commit_fault_discards_unit() {
        let store = InMemoryLedgerStore::new();
        let account = store.create_account("buyer01").await.unwrap();
        store.inject_fault(Fault::CommitFailure).await;

        let mut unit = store.begin().await.unwrap();
        unit.adjust_balance(account.id, dec!(10)).await.unwrap();
        unit.insert_order(topup(account.id, "INV18102026-0001", dec!(10)))
            .await
            .unwrap();
        assert!(matches!(
            unit.commit().await,
            Err(StoreError::Unavailable(_))
        ));

        let account = store.get_account("buyer01").await.unwrap().unwrap();
        assert_eq!(account.balance, Balance::zero());
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let store = InMemoryLedgerStore::new();
        let account = store.create_account("buyer01").await.unwrap();
        let now = Utc::now();

        let mut unit = store.begin().await.unwrap();
        for (i, offset) in [3i64, 1, 2].iter().enumerate() {
            let mut order = topup(account.id, &format!("INV18102026-000{}", i + 1), dec!(1));
            order.created_at = now + chrono::Duration::seconds(*offset);
            unit.insert_order(order).await.unwrap();
        }
        unit.commit().await.unwrap();

        let orders = store.list_orders(account.id).await.unwrap();
        let invoices: Vec<&str> = orders.iter().map(|o| o.invoice.as_str()).collect();
        assert_eq!(invoices, ["INV18102026-0001", "INV18102026-0003", "INV18102026-0002"]);
        assert!(orders.iter().all(|o| o.kind == OrderKind::Topup));
    }
}
