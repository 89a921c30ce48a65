//! commerce_ledger Library
//!
//! Re-exports modules for integration testing and the binaries.

pub mod api;
pub mod domain;
pub mod handlers;
pub mod ledger;
pub mod store;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use domain::{Amount, AmountError, Balance, LedgerError, OperationContext};
pub use error::AppError;
pub use ledger::Ledger;
