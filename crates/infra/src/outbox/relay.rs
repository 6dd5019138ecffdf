//! Outbox relay: drains pending intents and hands them to a mailer.

use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use vaultline_notifications::{NotificationIntent, NotificationStatus};

use crate::config::LedgerConfig;

use super::store::{NotificationOutbox, OutboxError};

/// Transport failure reported by a mailer.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Mail transport port.
pub trait Mailer: Send + Sync {
    fn send(&self, intent: &NotificationIntent) -> Result<(), MailError>;
}

impl<M> Mailer for Arc<M>
where
    M: Mailer + ?Sized,
{
    fn send(&self, intent: &NotificationIntent) -> Result<(), MailError> {
        (**self).send(intent)
    }
}

/// Mailer that writes each message to the log instead of a transport.
#[derive(Debug, Clone)]
pub struct LogMailer {
    sender: String,
}

impl LogMailer {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

impl Mailer for LogMailer {
    fn send(&self, intent: &NotificationIntent) -> Result<(), MailError> {
        info!(
            from = %self.sender,
            to = %intent.recipient,
            subject = %intent.subject,
            notification_id = %intent.id,
            "mail sent"
        );
        Ok(())
    }
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Intents drained per pass
    pub batch_size: usize,
    /// Failed deliveries before an intent is FAILED
    pub max_attempts: u32,
    /// Sleep between passes that found nothing to send
    pub poll_interval: Duration,
    /// Name for logging
    pub name: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for RelayConfig {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            batch_size: config.outbox_batch_size,
            max_attempts: config.outbox_max_attempts,
            poll_interval: config.relay_poll_interval(),
            name: "outbox-relay".to_string(),
        }
    }
}

/// Result of one relay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RelayReport {
    pub sent: usize,
    /// Failed this pass, still PENDING
    pub retrying: usize,
    /// Failed this pass and gave up
    pub failed: usize,
}

impl RelayReport {
    pub fn attempted(&self) -> usize {
        self.sent + self.retrying + self.failed
    }

    fn absorb(&mut self, other: &RelayReport) {
        self.sent += other.sent;
        self.retrying += other.retrying;
        self.failed += other.failed;
    }
}

/// Delivers outbox intents through a `Mailer`.
pub struct OutboxRelay<O, M> {
    outbox: O,
    mailer: M,
    config: RelayConfig,
}

impl<O, M> OutboxRelay<O, M>
where
    O: NotificationOutbox,
    M: Mailer,
{
    pub fn new(outbox: O, mailer: M, config: RelayConfig) -> Self {
        Self {
            outbox,
            mailer,
            config,
        }
    }

    /// Drain one batch and attempt every intent in it.
    pub fn run_once(&self) -> Result<RelayReport, OutboxError> {
        let batch = self.outbox.drain(self.config.batch_size)?;
        let mut report = RelayReport::default();

        for intent in batch {
            match self.mailer.send(&intent) {
                Ok(()) => {
                    self.outbox.mark_sent(intent.id)?;
                    report.sent += 1;
                }
                Err(err) => {
                    let updated = self.outbox.mark_failed(
                        intent.id,
                        &err.to_string(),
                        self.config.max_attempts,
                    )?;
                    if updated.status == NotificationStatus::Failed {
                        error!(
                            relay = %self.config.name,
                            notification_id = %intent.id,
                            attempts = updated.attempts,
                            error = %err,
                            "notification abandoned"
                        );
                        report.failed += 1;
                    } else {
                        warn!(
                            relay = %self.config.name,
                            notification_id = %intent.id,
                            attempts = updated.attempts,
                            error = %err,
                            "notification delivery failed, will retry"
                        );
                        report.retrying += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    /// Spawn the relay in a background thread.
    pub fn spawn(self) -> RelayHandle
    where
        O: 'static,
        M: 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let totals = Arc::new(Mutex::new(RelayReport::default()));
        let totals_clone = totals.clone();

        let name = self.config.name.clone();
        let spawned = thread::Builder::new()
            .name(name)
            .spawn(move || relay_loop(self, shutdown_rx, totals_clone));

        let join = match spawned {
            Ok(join) => Some(join),
            Err(e) => {
                error!(error = %e, "failed to spawn outbox relay thread");
                None
            }
        };

        RelayHandle {
            shutdown: shutdown_tx,
            join,
            totals,
        }
    }
}

/// Handle to control a running relay.
#[derive(Debug)]
pub struct RelayHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    totals: Arc<Mutex<RelayReport>>,
}

impl RelayHandle {
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Cumulative report across all passes so far.
    pub fn totals(&self) -> RelayReport {
        self.totals.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// Request graceful shutdown and wait for the current pass to finish.
    pub fn shutdown(mut self) -> RelayReport {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
        self.totals()
    }
}

fn relay_loop<O, M>(
    relay: OutboxRelay<O, M>,
    shutdown_rx: mpsc::Receiver<()>,
    totals: Arc<Mutex<RelayReport>>,
) where
    O: NotificationOutbox,
    M: Mailer,
{
    info!(relay = %relay.config.name, "outbox relay started");

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let idle = match relay.run_once() {
            Ok(report) => {
                if report.attempted() > 0 {
                    debug!(
                        relay = %relay.config.name,
                        sent = report.sent,
                        retrying = report.retrying,
                        failed = report.failed,
                        "relay pass complete"
                    );
                }
                if let Ok(mut t) = totals.lock() {
                    t.absorb(&report);
                }
                report.attempted() == 0
            }
            Err(e) => {
                error!(relay = %relay.config.name, error = %e, "relay pass failed");
                true
            }
        };

        if idle {
            match shutdown_rx.recv_timeout(relay.config.poll_interval) {
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => {}
            }
        }
    }

    info!(relay = %relay.config.name, "outbox relay stopped");
}
