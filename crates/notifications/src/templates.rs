//! Message bodies for ledger notifications.

use vaultline_accounts::Account;

pub const ACCOUNT_CREATED_SUBJECT: &str = "Account creation";

/// Welcome message for a newly opened account: `(subject, body)`.
pub fn account_created(account: &Account) -> (String, String) {
    let body = format!(
        "Congratulations! Your account has been successfully created.\n\n\
         Here are your account details:\n\
         ------------------------------------\n\
         Account Name: {}\n\
         Account Number: {}\n\
         ------------------------------------\n\
         Thank you for choosing our services!",
        account.display_name(),
        account.account_number(),
    );
    (ACCOUNT_CREATED_SUBJECT.to_string(), body)
}
