//! Account Opening Handler
//!
//! Creates the single zero-balance account a user gets at registration.

use std::sync::Arc;

use crate::domain::{Account, LedgerError, OperationContext};
use crate::store::LedgerStore;

use super::OpenAccountCommand;

/// Handler for account creation
pub struct OpenAccountHandler {
    store: Arc<dyn LedgerStore>,
}

impl OpenAccountHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Execute the open account command
    pub async fn execute(
        &self,
        command: OpenAccountCommand,
        context: &OperationContext,
    ) -> Result<Account, LedgerError> {
        command.validate()?;

        let account = self.store.create_account(&command.username).await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            account_id = account.id,
            owner = %account.owner,
            "Account opened"
        );

        Ok(account)
    }
}
