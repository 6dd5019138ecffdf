//! Caller-facing response envelope.

use serde::{Deserialize, Serialize};

use vaultline_accounts::AccountInfo;

use crate::error::LedgerError;

pub const ACCOUNT_CREATED: &str = "002";
pub const ACCOUNT_FOUND: &str = "004";
pub const ACCOUNT_CREDITED: &str = "005";
pub const ACCOUNT_DEBITED: &str = "007";
pub const TRANSFER_SUCCESSFUL: &str = "008";
pub const NAME_FOUND: &str = "017";
pub const STATUS_CHANGED: &str = "018";

pub const ACCOUNT_CREATED_MESSAGE: &str = "Account has been created successfully!";
pub const ACCOUNT_FOUND_MESSAGE: &str = "User Account Found";
pub const ACCOUNT_CREDITED_MESSAGE: &str = "User Account Credited success";
pub const ACCOUNT_DEBITED_MESSAGE: &str = "Account debited successfully!";
pub const TRANSFER_SUCCESSFUL_MESSAGE: &str = "Transfer successful!";

/// Success or failure of one ledger operation, as shown to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerResponse {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_info: Option<AccountInfo>,
}

impl LedgerResponse {
    pub fn success(code: &str, message: impl Into<String>, info: Option<AccountInfo>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            account_info: info,
        }
    }

    pub fn failure(err: &LedgerError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.message(),
            account_info: err.account().cloned(),
        }
    }

    /// Render the outcome of an operation returning a projection.
    pub fn from_outcome(
        code: &str,
        message: &str,
        outcome: &Result<AccountInfo, LedgerError>,
    ) -> Self {
        match outcome {
            Ok(info) => Self::success(code, message, Some(info.clone())),
            Err(err) => Self::failure(err),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self.code.as_str(),
            ACCOUNT_CREATED
                | ACCOUNT_FOUND
                | ACCOUNT_CREDITED
                | ACCOUNT_DEBITED
                | TRANSFER_SUCCESSFUL
                | NAME_FOUND
                | STATUS_CHANGED
        )
    }
}
