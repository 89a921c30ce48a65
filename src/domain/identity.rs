//! Caller identity
//!
//! Produced once by the identity-resolution collaborator (the gateway that
//! verifies tokens) and passed by value into the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    Merchant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "CLIENT",
            Role::Merchant => "MERCHANT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CLIENT" => Ok(Role::Client),
            "MERCHANT" => Ok(Role::Merchant),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub username: String,
    pub role: Role,
}

impl CallerIdentity {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }
}
