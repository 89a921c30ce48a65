//! Query Handler
//!
//! Read-only views over committed state. Nothing here opens an atomic unit.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::{Account, LedgerError, Order};
use crate::store::LedgerStore;

use super::ReconcileReport;

/// Handler for balance and history reads
pub struct QueryHandler {
    store: Arc<dyn LedgerStore>,
}

impl QueryHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Committed account for `owner`
    pub async fn get_balance(&self, owner: &str) -> Result<Account, LedgerError> {
        self.store
            .get_account(owner)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(owner.to_string()))
    }

    /// Every order of the owner's account, newest first.
    ///
    /// Holds no cursor; calling it again with no writes in between returns
    /// the same sequence.
    pub async fn list_history(&self, owner: &str) -> Result<Vec<Order>, LedgerError> {
        let account = self.get_balance(owner).await?;
        Ok(self.store.list_orders(account.id).await?)
    }

    /// Recompute the balance from the ledger and compare with the stored one
    pub async fn reconcile(&self, owner: &str) -> Result<ReconcileReport, LedgerError> {
        let account = self.get_balance(owner).await?;
        let orders = self.store.list_orders(account.id).await?;

        let computed: Decimal = orders.iter().map(Order::signed_amount).sum();
        let report = ReconcileReport {
            owner: account.owner,
            recorded: account.balance.value(),
            computed,
            entries: orders.len(),
        };

        if !report.is_consistent() {
            tracing::error!(
                owner = %report.owner,
                recorded = %report.recorded,
                computed = %report.computed,
                "Balance does not match ledger"
            );
        }

        Ok(report)
    }
}
