//! Inbound parameter sets for balance-changing operations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Credit or debit of a single account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditDebit {
    pub account_number: String,
    pub amount: Decimal,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl CreditDebit {
    pub fn new(account_number: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_number: account_number.into(),
            amount,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Move `amount` from `source_account_number` to `destination_account_number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub source_account_number: String,
    pub destination_account_number: String,
    pub amount: Decimal,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl Transfer {
    pub fn new(source: impl Into<String>, destination: impl Into<String>, amount: Decimal) -> Self {
        Self {
            source_account_number: source.into(),
            destination_account_number: destination.into(),
            amount,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}
