use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vaultline_core::NotificationId;

/// Delivery status of an outbox record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationStatus {
    /// Waiting for (re)delivery
    Pending,
    /// Delivery confirmed by the mailer
    Sent,
    /// Gave up after exhausting delivery attempts
    Failed,
}

impl NotificationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, NotificationStatus::Sent | NotificationStatus::Failed)
    }
}

/// A message the ledger wants delivered, committed with the mutation that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub id: NotificationId,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub status: NotificationStatus,
    /// Delivery attempts made so far.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationIntent {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            status: NotificationStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn mark_sent(&mut self, at: DateTime<Utc>) {
        self.attempts += 1;
        self.status = NotificationStatus::Sent;
        self.last_error = None;
        self.updated_at = at;
    }

    /// Record a failed delivery; the intent stays PENDING until `max_attempts`
    /// deliveries have failed, then becomes FAILED.
    pub fn record_failure(&mut self, error: impl Into<String>, max_attempts: u32, at: DateTime<Utc>) {
        self.attempts += 1;
        self.last_error = Some(error.into());
        self.updated_at = at;
        self.status = if self.attempts >= max_attempts {
            NotificationStatus::Failed
        } else {
            NotificationStatus::Pending
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent() -> NotificationIntent {
        NotificationIntent::new("ada@example.com", "Account creation", "hello", Utc::now())
    }

    #[test]
    fn new_intents_are_pending() {
        let intent = intent();
        assert_eq!(intent.status, NotificationStatus::Pending);
        assert_eq!(intent.attempts, 0);
    }

    #[test]
    fn failures_retry_until_exhausted() {
        let mut intent = intent();
        intent.record_failure("smtp down", 3, Utc::now());
        intent.record_failure("smtp down", 3, Utc::now());
        assert_eq!(intent.status, NotificationStatus::Pending);
        intent.record_failure("smtp down", 3, Utc::now());
        assert_eq!(intent.status, NotificationStatus::Failed);
        assert_eq!(intent.attempts, 3);
        assert_eq!(intent.last_error.as_deref(), Some("smtp down"));
    }

    #[test]
    fn sent_clears_last_error() {
        let mut intent = intent();
        intent.record_failure("timeout", 5, Utc::now());
        intent.mark_sent(Utc::now());
        assert_eq!(intent.status, NotificationStatus::Sent);
        assert!(intent.status.is_terminal());
        assert_eq!(intent.last_error, None);
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&NotificationStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
    }
}
