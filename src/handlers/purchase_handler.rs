//! Purchase Handler
//!
//! Moves `price x qty` from the buyer to the product's merchant and records
//! a PAYMENT order on the buyer and a REVENUE order on the merchant, all in
//! one atomic unit.

use std::sync::Arc;

use crate::domain::{
    Amount, InvoiceSequencer, LedgerError, NewOrder, OperationContext, Order, OrderKind, Product,
};
use crate::store::{AtomicUnit, LedgerStore, ProductCatalog};

use super::{
    abort_unit, current_time, lock_existing, retry_on_invoice_conflict, Clock, PurchaseCommand,
};

/// Handler for product purchases
pub struct PurchaseHandler {
    store: Arc<dyn LedgerStore>,
    catalog: Arc<dyn ProductCatalog>,
    sequencer: InvoiceSequencer,
    clock: Clock,
}

impl PurchaseHandler {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        catalog: Arc<dyn ProductCatalog>,
        sequencer: InvoiceSequencer,
        clock: Clock,
    ) -> Self {
        Self {
            store,
            catalog,
            sequencer,
            clock,
        }
    }

    /// Execute the purchase command, returning the buyer-side order
    pub async fn execute(
        &self,
        command: PurchaseCommand,
        context: &OperationContext,
    ) -> Result<Order, LedgerError> {
        let (code, quantity) = command.validate()?;
        let buyer = command.username.as_str();

        let product = self
            .catalog
            .by_code(&code)
            .await?
            .ok_or_else(|| LedgerError::ProductNotFound(code.clone()))?;

        if product.merchant == buyer {
            return Err(LedgerError::invalid_input("Cannot purchase your own product"));
        }

        // Revenue equals the buyer's total, so the two balances always sum to the same value
        let total = product.price.checked_mul(quantity)?;

        let order = retry_on_invoice_conflict("purchase", || {
            self.try_execute(buyer, &product, total)
        })
        .await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            buyer = %buyer,
            merchant = %product.merchant,
            product = %product.code,
            quantity = quantity,
            invoice = %order.invoice,
            amount = %total,
            "Purchase committed"
        );

        Ok(order)
    }

    async fn try_execute(
        &self,
        buyer: &str,
        product: &Product,
        total: Amount,
    ) -> Result<Order, LedgerError> {
        let mut unit = self.store.begin().await?;

        let result = self.apply(unit.as_mut(), buyer, product, total).await;
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
        buyer: &str,
        product: &Product,
        total: Amount,
    ) -> Result<Order, LedgerError> {
        let merchant = product.merchant.as_str();

        // Rows are always locked in owner-name order so that two mirrored
        // purchases (A buys from B, B buys from A) cannot deadlock.
        let (first, second) = if buyer < merchant {
            (buyer, merchant)
        } else {
            (merchant, buyer)
        };
        let first_account = lock_existing(unit, first).await?;
        let second_account = lock_existing(unit, second).await?;
        let (buyer_account, merchant_account) = if first == buyer {
            (first_account, second_account)
        } else {
            (second_account, first_account)
        };

        if !buyer_account.balance.is_sufficient_for(&total) {
            return Err(LedgerError::insufficient_balance(
                total.value(),
                buyer_account.balance.value(),
            ));
        }

        let now = current_time(self.clock);
        let buyer_invoice = self
            .sequencer
            .next_invoice(unit, buyer_account.id, now)
            .await?;
        let merchant_invoice = self
            .sequencer
            .next_invoice(unit, merchant_account.id, now)
            .await?;

        unit.adjust_balance(buyer_account.id, -total.value()).await?;
        unit.adjust_balance(merchant_account.id, total.value()).await?;

        let payment = unit
            .insert_order(NewOrder::purchase_leg(
                OrderKind::Payment,
                buyer_account.id,
                buyer_invoice,
                total,
                product,
                buyer,
                now,
            ))
            .await?;
        unit.insert_order(NewOrder::purchase_leg(
            OrderKind::Revenue,
            merchant_account.id,
            merchant_invoice,
            total,
            product,
            buyer,
            now,
        ))
        .await?;

        Ok(payment)
    }
}
