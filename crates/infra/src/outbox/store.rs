use std::sync::Arc;

use vaultline_core::NotificationId;
use vaultline_notifications::{NotificationIntent, NotificationStatus};

use crate::store::InMemoryAccountStore;

/// Outbox operation error.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum OutboxError {
    #[error("notification not found: {0}")]
    NotFound(NotificationId),
    #[error("notification {id} is {status:?}, expected PENDING")]
    NotPending {
        id: NotificationId,
        status: NotificationStatus,
    },
    #[error("storage error: {0}")]
    Storage(String),
}

/// Outbox statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct OutboxStats {
    pub pending: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Consumer side of the notification outbox.
pub trait NotificationOutbox: Send + Sync {
    /// Up to `limit` PENDING intents, oldest first. Does not change their status.
    fn drain(&self, limit: usize) -> Result<Vec<NotificationIntent>, OutboxError>;

    fn get(&self, id: NotificationId) -> Result<Option<NotificationIntent>, OutboxError>;

    /// Confirm delivery. Confirming an already-sent intent is a no-op.
    fn mark_sent(&self, id: NotificationId) -> Result<NotificationIntent, OutboxError>;

    /// Record a failed delivery; FAILED once `max_attempts` deliveries have failed.
    fn mark_failed(
        &self,
        id: NotificationId,
        error: &str,
        max_attempts: u32,
    ) -> Result<NotificationIntent, OutboxError>;

    fn stats(&self) -> Result<OutboxStats, OutboxError>;
}

impl<O> NotificationOutbox for Arc<O>
where
    O: NotificationOutbox + ?Sized,
{
    fn drain(&self, limit: usize) -> Result<Vec<NotificationIntent>, OutboxError> {
        (**self).drain(limit)
    }

    fn get(&self, id: NotificationId) -> Result<Option<NotificationIntent>, OutboxError> {
        (**self).get(id)
    }

    fn mark_sent(&self, id: NotificationId) -> Result<NotificationIntent, OutboxError> {
        (**self).mark_sent(id)
    }

    fn mark_failed(
        &self,
        id: NotificationId,
        error: &str,
        max_attempts: u32,
    ) -> Result<NotificationIntent, OutboxError> {
        (**self).mark_failed(id, error, max_attempts)
    }

    fn stats(&self) -> Result<OutboxStats, OutboxError> {
        (**self).stats()
    }
}

impl NotificationOutbox for InMemoryAccountStore {
    fn drain(&self, limit: usize) -> Result<Vec<NotificationIntent>, OutboxError> {
        let tables = self.shared.tables.read();
        Ok(tables
            .outbox
            .iter()
            .filter(|i| i.status == NotificationStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    fn get(&self, id: NotificationId) -> Result<Option<NotificationIntent>, OutboxError> {
        let tables = self.shared.tables.read();
        Ok(tables
            .outbox_index
            .get(&id)
            .and_then(|&pos| tables.outbox.get(pos))
            .cloned())
    }

    fn mark_sent(&self, id: NotificationId) -> Result<NotificationIntent, OutboxError> {
        let now = self.shared.clock.now();
        let mut tables = self.shared.tables.write();
        let pos = *tables.outbox_index.get(&id).ok_or(OutboxError::NotFound(id))?;
        let intent = tables
            .outbox
            .get_mut(pos)
            .ok_or_else(|| OutboxError::Storage(format!("outbox index out of sync for {id}")))?;

        if intent.status != NotificationStatus::Sent {
            intent.mark_sent(now);
        }
        Ok(intent.clone())
    }

    fn mark_failed(
        &self,
        id: NotificationId,
        error: &str,
        max_attempts: u32,
    ) -> Result<NotificationIntent, OutboxError> {
        let now = self.shared.clock.now();
        let mut tables = self.shared.tables.write();
        let pos = *tables.outbox_index.get(&id).ok_or(OutboxError::NotFound(id))?;
        let intent = tables
            .outbox
            .get_mut(pos)
            .ok_or_else(|| OutboxError::Storage(format!("outbox index out of sync for {id}")))?;

        if intent.status != NotificationStatus::Pending {
            return Err(OutboxError::NotPending {
                id,
                status: intent.status,
            });
        }
        intent.record_failure(error, max_attempts, now);
        Ok(intent.clone())
    }

    fn stats(&self) -> Result<OutboxStats, OutboxError> {
        let tables = self.shared.tables.read();
        let mut stats = OutboxStats::default();
        for intent in &tables.outbox {
            match intent.status {
                NotificationStatus::Pending => stats.pending += 1,
                NotificationStatus::Sent => stats.sent += 1,
                NotificationStatus::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }
}
