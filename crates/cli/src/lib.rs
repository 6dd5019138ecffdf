//! `vaultline` operator tool: replays ledger scripts against an in-memory ledger.

pub mod relay;
pub mod script;

pub use relay::deliver_outbox;
pub use script::{run_script, Operation, ScriptSummary};
