//! Topup Handler
//!
//! Credits an account and records the matching TOPUP order in one unit.

use std::sync::Arc;

use crate::domain::{Amount, InvoiceSequencer, LedgerError, NewOrder, OperationContext, Order};
use crate::store::{AtomicUnit, LedgerStore};

use super::{abort_unit, current_time, lock_existing, retry_on_invoice_conflict, Clock, TopupCommand};

/// Handler for balance topups
pub struct TopupHandler {
    store: Arc<dyn LedgerStore>,
    sequencer: InvoiceSequencer,
    clock: Clock,
}

impl TopupHandler {
    pub fn new(store: Arc<dyn LedgerStore>, sequencer: InvoiceSequencer, clock: Clock) -> Self {
        Self {
            store,
            sequencer,
            clock,
        }
    }

    /// Execute the topup command
    pub async fn execute(
        &self,
        command: TopupCommand,
        context: &OperationContext,
    ) -> Result<Order, LedgerError> {
        let amount = command.validate()?;
        let username = command.username.as_str();

        let order =
            retry_on_invoice_conflict("topup", || self.try_execute(username, amount)).await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            username = %username,
            invoice = %order.invoice,
            amount = %order.amount,
            "Topup committed"
        );

        Ok(order)
    }

    async fn try_execute(&self, username: &str, amount: Amount) -> Result<Order, LedgerError> {
        let mut unit = self.store.begin().await?;

        let result = self.apply(unit.as_mut(), username, amount).await;
        match result {
            Ok(order) => {
                unit.commit().await?;
                Ok(order)
            }
            Err(e) => Err(abort_unit(unit, e).await),
        }
    }

    async fn apply(
        &self,
        unit: &mut dyn AtomicUnit,
        username: &str,
        amount: Amount,
    ) -> Result<Order, LedgerError> {
        let account = lock_existing(unit, username).await?;
        let now = current_time(self.clock);

        let invoice = self.sequencer.next_invoice(unit, account.id, now).await?;

        unit.adjust_balance(account.id, amount.value()).await?;
        let order = unit
            .insert_order(NewOrder::topup(account.id, invoice, amount, now))
            .await?;

        Ok(order)
    }
}
