//! Domain module
//!
//! Core ledger types and business rules.

pub mod amount;
pub mod context;
pub mod error;
pub mod identity;
pub mod invoice;
pub mod order;

pub use amount::{Amount, AmountError, Balance};
pub use context::OperationContext;
pub use error::LedgerError;
pub use identity::{CallerIdentity, Role};
pub use invoice::InvoiceSequencer;
pub use order::{Account, NewOrder, Order, OrderKind, Product};
