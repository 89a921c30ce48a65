//! Ledger facade
//!
//! Bundles the handlers around one injected store so callers (HTTP layer,
//! tools, tests) see the ledger operations as plain async methods.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use crate::domain::{Account, InvoiceSequencer, LedgerError, OperationContext, Order, Product};
use crate::handlers::{
    normalize_product_code, Clock, OpenAccountCommand, OpenAccountHandler, PurchaseCommand,
    PurchaseHandler, QueryHandler, ReconcileReport, TopupCommand, TopupHandler,
};
use crate::store::{InMemoryLedgerStore, LedgerStore, PgLedgerStore, ProductCatalog};

/// Entry point to every ledger operation
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    catalog: Arc<dyn ProductCatalog>,
    sequencer: InvoiceSequencer,
    clock: Clock,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self {
            store,
            catalog,
            sequencer: InvoiceSequencer::default(),
            clock: Utc::now,
        }
    }

    /// Ledger over an in-memory store that also serves as product catalog
    pub fn in_memory(store: InMemoryLedgerStore) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store)
    }

    /// Ledger over PostgreSQL
    pub fn postgres(pool: PgPool, lock_timeout: Option<Duration>) -> Self {
        let mut store = PgLedgerStore::new(pool);
        if let Some(timeout) = lock_timeout {
            store = store.with_lock_timeout(timeout);
        }
        let store = Arc::new(store);
        Self::new(store.clone(), store)
    }

    pub fn with_sequencer(mut self, sequencer: InvoiceSequencer) -> Self {
        self.sequencer = sequencer;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn sequencer(&self) -> InvoiceSequencer {
        self.sequencer
    }

    pub async fn open_account(
        &self,
        username: &str,
        context: &OperationContext,
    ) -> Result<Account, LedgerError> {
        OpenAccountHandler::new(self.store.clone())
            .execute(OpenAccountCommand::new(username), context)
            .await
    }

    pub async fn topup(
        &self,
        username: &str,
        amount: &str,
        context: &OperationContext,
    ) -> Result<Order, LedgerError> {
        TopupHandler::new(self.store.clone(), self.sequencer, self.clock)
            .execute(TopupCommand::new(username, amount), context)
            .await
    }

    pub async fn purchase(
        &self,
        username: &str,
        code: &str,
        quantity: i64,
        context: &OperationContext,
    ) -> Result<Order, LedgerError> {
        PurchaseHandler::new(
            self.store.clone(),
            self.catalog.clone(),
            self.sequencer,
            self.clock,
        )
        .execute(PurchaseCommand::new(username, code, quantity), context)
        .await
    }

    pub async fn get_balance(&self, username: &str) -> Result<Account, LedgerError> {
        QueryHandler::new(self.store.clone())
            .get_balance(username)
            .await
    }

    pub async fn list_history(&self, username: &str) -> Result<Vec<Order>, LedgerError> {
        QueryHandler::new(self.store.clone())
            .list_history(username)
            .await
    }

    pub async fn reconcile(&self, username: &str) -> Result<ReconcileReport, LedgerError> {
        QueryHandler::new(self.store.clone()).reconcile(username).await
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, LedgerError> {
        Ok(self.catalog.list().await?)
    }

    pub async fn get_product(&self, code: &str) -> Result<Product, LedgerError> {
        let code = normalize_product_code(code)?;
        self.catalog
            .by_code(&code)
            .await?
            .ok_or_else(|| LedgerError::ProductNotFound(code.clone()))
    }
}
