//! Outbox delivery around a script run.

use vaultline_infra::{
    InMemoryAccountStore, Mailer, NotificationOutbox, OutboxError, OutboxRelay, RelayConfig,
    RelayHandle, RelayReport,
};

/// Stop a background relay, then flush whatever it had not reached yet.
///
/// Intents that are still retrying after a flush pass stay PENDING; the flush
/// stops once a pass delivers nothing new.
pub fn deliver_outbox<M>(
    handle: Option<RelayHandle>,
    store: &InMemoryAccountStore,
    mailer: M,
    config: RelayConfig,
) -> Result<RelayReport, OutboxError>
where
    M: Mailer,
{
    let mut total = handle.map(RelayHandle::shutdown).unwrap_or_default();
    let relay = OutboxRelay::new(store.clone(), mailer, config);

    loop {
        let pass = relay.run_once()?;
        total.sent += pass.sent;
        total.retrying += pass.retrying;
        total.failed += pass.failed;
        if pass.sent == 0 && pass.failed == 0 {
            break;
        }
    }

    tracing::info!(
        sent = total.sent,
        retrying = total.retrying,
        failed = total.failed,
        pending = store.stats()?.pending,
        "outbox delivery finished"
    );
    Ok(total)
}
