//! JSON-lines operation scripts.
//!
//! One operation per line, tagged by `op`:
//!
//! ```text
//! {"op":"open_account","first_name":"Ada","last_name":"Obi","email":"ada@example.com"}
//! {"op":"credit","account_number":"2026123456","amount":"100.00"}
//! {"op":"transfer","source_account_number":"2026123456","destination_account_number":"2026654321","amount":"25"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Every other line yields
//! exactly one response line, including lines that fail to parse.

use std::io::{BufRead, Write};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vaultline_accounts::{AccountStatus, NumberSource, OpenAccount};
use vaultline_infra::AccountStore;
use vaultline_ledger::response::{
    ACCOUNT_CREATED, ACCOUNT_CREATED_MESSAGE, ACCOUNT_CREDITED, ACCOUNT_CREDITED_MESSAGE,
    ACCOUNT_DEBITED, ACCOUNT_DEBITED_MESSAGE, ACCOUNT_FOUND, ACCOUNT_FOUND_MESSAGE, NAME_FOUND,
    STATUS_CHANGED, TRANSFER_SUCCESSFUL, TRANSFER_SUCCESSFUL_MESSAGE,
};
use vaultline_ledger::{CreditDebit, Ledger, LedgerError, LedgerResponse, Transfer};

/// One scripted ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    OpenAccount(OpenAccount),
    Credit(CreditDebit),
    Debit(CreditDebit),
    Transfer(Transfer),
    Balance {
        account_number: String,
    },
    Name {
        account_number: String,
    },
    ChangeStatus {
        account_number: String,
        status: AccountStatus,
    },
}

impl Operation {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Run against `ledger` and render the outcome.
    pub fn execute<S, N>(self, ledger: &Ledger<S, N>) -> LedgerResponse
    where
        S: AccountStore,
        N: NumberSource,
    {
        match self {
            Operation::OpenAccount(request) => LedgerResponse::from_outcome(
                ACCOUNT_CREATED,
                ACCOUNT_CREATED_MESSAGE,
                &ledger.create_account(request),
            ),
            Operation::Credit(request) => LedgerResponse::from_outcome(
                ACCOUNT_CREDITED,
                ACCOUNT_CREDITED_MESSAGE,
                &ledger.credit(request),
            ),
            Operation::Debit(request) => LedgerResponse::from_outcome(
                ACCOUNT_DEBITED,
                ACCOUNT_DEBITED_MESSAGE,
                &ledger.debit(request),
            ),
            Operation::Transfer(request) => LedgerResponse::from_outcome(
                TRANSFER_SUCCESSFUL,
                TRANSFER_SUCCESSFUL_MESSAGE,
                &ledger.transfer(request),
            ),
            Operation::Balance { account_number } => LedgerResponse::from_outcome(
                ACCOUNT_FOUND,
                ACCOUNT_FOUND_MESSAGE,
                &ledger.balance_enquiry(&account_number),
            ),
            Operation::Name { account_number } => match ledger.name_enquiry(&account_number) {
                Ok(name) => LedgerResponse::success(NAME_FOUND, name, None),
                Err(err) => LedgerResponse::failure(&err),
            },
            Operation::ChangeStatus {
                account_number,
                status,
            } => LedgerResponse::from_outcome(
                STATUS_CHANGED,
                &format!("Account is now {status}"),
                &ledger.change_status(&account_number, status),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptSummary {
    pub executed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Replay every operation in `input`, writing one JSON response per line to `output`.
pub fn run_script<S, N, R, W>(
    ledger: &Ledger<S, N>,
    input: R,
    mut output: W,
) -> anyhow::Result<ScriptSummary>
where
    S: AccountStore,
    N: NumberSource,
    R: BufRead,
    W: Write,
{
    let mut summary = ScriptSummary::default();

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("reading script line {line_no}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let response = match Operation::parse(trimmed) {
            Ok(operation) => {
                debug!(line = line_no, ?operation, "executing");
                operation.execute(ledger)
            }
            Err(e) => LedgerResponse::failure(&LedgerError::InvalidRequest(format!(
                "line {line_no}: {e}"
            ))),
        };

        summary.executed += 1;
        if response.is_success() {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }

        serde_json::to_writer(&mut output, &response)
            .with_context(|| format!("writing response for line {line_no}"))?;
        output.write_all(b"\n")?;
    }

    output.flush()?;
    info!(
        executed = summary.executed,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "script finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use vaultline_accounts::ScriptedNumberSource;
    use vaultline_core::FixedClock;
    use vaultline_infra::{InMemoryAccountStore, LedgerConfig};

    fn ledger() -> Ledger<InMemoryAccountStore, ScriptedNumberSource> {
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()));
        Ledger::new(
            InMemoryAccountStore::new(),
            ScriptedNumberSource::new([123_456, 654_321]),
            LedgerConfig::default(),
        )
        .with_clock(clock)
    }

    fn run(script: &str) -> (ScriptSummary, Vec<LedgerResponse>) {
        let ledger = ledger();
        let mut out = Vec::new();
        let summary = run_script(&ledger, script.as_bytes(), &mut out).unwrap();
        let responses = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (summary, responses)
    }

    #[test]
    fn parses_tagged_operations() {
        let op = Operation::parse(r#"{"op":"credit","account_number":"2026123456","amount":"10.5"}"#)
            .unwrap();
        match op {
            Operation::Credit(request) => {
                assert_eq!(request.account_number, "2026123456");
                assert_eq!(request.idempotency_key, None);
            }
            other => panic!("unexpected operation: {other:?}"),
        }

        let op = Operation::parse(
            r#"{"op":"change_status","account_number":"2026123456","status":"SUSPENDED"}"#,
        )
        .unwrap();
        assert!(matches!(
            op,
            Operation::ChangeStatus {
                status: AccountStatus::Suspended,
                ..
            }
        ));
    }

    #[test]
    fn replays_a_script_line_by_line() {
        let script = r#"
# open two accounts, move money between them
{"op":"open_account","first_name":"X","last_name":"Y","email":"x@y.com"}
{"op":"open_account","first_name":"Second","last_name":"Holder","email":"s@y.com"}
{"op":"credit","account_number":"2026123456","amount":"100"}
{"op":"debit","account_number":"2026123456","amount":"150"}
{"op":"transfer","source_account_number":"2026123456","destination_account_number":"2026654321","amount":"100"}
{"op":"name","account_number":"2026654321"}
"#;
        let (summary, responses) = run(script);

        assert_eq!(summary.executed, 6);
        assert_eq!(summary.failed, 1);
        let codes: Vec<_> = responses.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, ["002", "002", "005", "006", "008", "017"]);
        assert_eq!(responses[0].message, "Account has been created successfully!");
        assert_eq!(responses[3].message, "Insufficient account balance!");
        assert_eq!(responses[4].message, "Transfer successful!");
        assert_eq!(responses[5].message, "Second Holder");
        assert!(responses[4].account_info.as_ref().unwrap().balance.is_zero());
    }

    #[test]
    fn malformed_lines_become_invalid_request_responses() {
        let (summary, responses) = run("{\"op\":\"explode\"}\n");
        assert_eq!(summary.failed, 1);
        assert_eq!(responses[0].code, "016");
        assert!(responses[0].message.contains("line 1"));
    }
}
