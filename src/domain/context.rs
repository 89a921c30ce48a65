//! Operation Context
//!
//! Metadata about the current operation, carried into log spans.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CallerIdentity;

/// Context for an operation, used for tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationContext {
    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,

    /// Caller resolved by the identity middleware
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller: Option<CallerIdentity>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self {
            correlation_id: None,
            caller: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn with_caller(mut self, caller: CallerIdentity) -> Self {
        self.caller = Some(caller);
        self
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}
