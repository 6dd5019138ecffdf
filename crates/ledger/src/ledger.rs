//! Ledger service: the only path through which balances change.
//!
//! Every mutation runs inside one `AccountStore::run_atomic` unit:
//!
//! ```text
//! claim idempotency key (if any)
//!   ↓
//! lock account(s), lexicographic by account number
//!   ↓
//! check existence, status and funds against the locked snapshots
//!   ↓
//! stage new snapshots (+ outbox record, + idempotency outcome)
//!   ↓
//! commit, or roll back everything
//! ```
//!
//! The ledger never holds state of its own besides configuration; concurrent
//! callers share one `Ledger` behind an `Arc`.

use std::sync::Arc;

use chrono::Datelike;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn, Span};

use vaultline_accounts::{
    Account, AccountInfo, AccountNumber, AccountNumberPolicy, AccountStatus, IdentityKey,
    NumberSource, OpenAccount,
};
use vaultline_core::{AccountId, Amount, Clock, SystemClock};
use vaultline_infra::{
    AccountStore, AtomicUnit, IdempotencyKey, IdempotencyRecord, LedgerConfig, StoreError,
};
use vaultline_notifications::{templates, NotificationIntent};

use crate::error::LedgerError;
use crate::request::{CreditDebit, Transfer};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Balance-changing operations over an [`AccountStore`].
pub struct Ledger<S, N> {
    store: S,
    numbers: AccountNumberPolicy<N>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl<S, N> Ledger<S, N>
where
    S: AccountStore,
    N: NumberSource,
{
    pub fn new(store: S, number_source: N, config: LedgerConfig) -> Self {
        Self {
            store,
            numbers: AccountNumberPolicy::new(number_source),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock used for opening dates and idempotency records.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Open an ACTIVE account with a zero balance and queue its welcome message.
    #[instrument(skip(self, request), fields(account_number = tracing::field::Empty))]
    pub fn create_account(&self, request: OpenAccount) -> LedgerResult<AccountInfo> {
        report("create_account", self.try_create_account(request))
    }

    fn try_create_account(&self, request: OpenAccount) -> LedgerResult<AccountInfo> {
        let identity = request.validate()?;
        let key = parse_key(request.idempotency_key.as_deref())?;
        let fingerprint = format!("open:{identity}");
        if self.store.exists_by_identity(&identity)? {
            return self.already_registered(&identity, key.as_ref(), &fingerprint);
        }

        let now = self.clock.now();
        let number = self.free_account_number(now.year())?;
        Span::current().record("account_number", tracing::field::display(&number));

        let created = self.store.run_atomic(|unit| -> LedgerResult<AccountInfo> {
            if let Some(replayed) = replay(unit, key.as_ref(), &fingerprint)? {
                return Ok(replayed);
            }

            let account = Account::open(AccountId::new(), number.clone(), identity.clone(), &request, now);
            let stored = unit.insert(account)?;

            let (subject, body) = templates::account_created(&stored);
            unit.enqueue(NotificationIntent::new(identity.as_str(), subject, body, now))?;

            let info = stored.info();
            self.remember(unit, key.as_ref(), &fingerprint, &info)?;
            debug!(account_id = %stored.id_typed(), "account staged");
            Ok(info)
        });

        let info = match created {
            Ok(info) => info,
            // Lost a race against another opening for the same identity.
            Err(LedgerError::Conflict(msg)) => {
                if self.store.exists_by_identity(&identity)? {
                    return self.already_registered(&identity, key.as_ref(), &fingerprint);
                }
                return Err(LedgerError::Conflict(msg));
            }
            Err(err) => return Err(err),
        };

        info!(account_number = %info.account_number, "account opened");
        Ok(info)
    }

    /// The identity is taken: a keyed retry of the opening that took it replays
    /// that opening, anything else is a duplicate registration.
    fn already_registered(
        &self,
        identity: &IdentityKey,
        key: Option<&IdempotencyKey>,
        fingerprint: &str,
    ) -> LedgerResult<AccountInfo> {
        if key.is_some() {
            let replayed = self
                .store
                .run_atomic(|unit| replay(unit, key, fingerprint))?;
            if let Some(info) = replayed {
                return Ok(info);
            }
        }
        Err(LedgerError::IdentityAlreadyRegistered {
            identity: identity.to_string(),
        })
    }

    /// Draw candidates until one is unused, at most `account_number_attempts` times.
    fn free_account_number(&self, year: i32) -> LedgerResult<AccountNumber> {
        let attempts = self.config.account_number_attempts;
        for attempt in 1..=attempts {
            let candidate = self.numbers.generate(year);
            if !self.store.exists_by_account_number(&candidate)? {
                return Ok(candidate);
            }
            debug!(attempt, candidate = %candidate, "account number already taken");
        }
        Err(LedgerError::AccountNumberExhausted { attempts })
    }

    /// Committed projection of an account; any status.
    pub fn balance_enquiry(&self, account_number: &str) -> LedgerResult<AccountInfo> {
        report("balance_enquiry", self.committed(account_number).map(|a| a.info()))
    }

    /// Display name of an account; any status.
    pub fn name_enquiry(&self, account_number: &str) -> LedgerResult<String> {
        report("name_enquiry", self.committed(account_number).map(|a| a.display_name()))
    }

    fn committed(&self, account_number: &str) -> LedgerResult<Account> {
        let number = parse_number(account_number).ok_or_else(|| not_found(account_number))?;
        self.store
            .get(&number)?
            .ok_or_else(|| not_found(account_number))
    }

    #[instrument(
        skip(self, request),
        fields(account_number = %request.account_number, amount = %request.amount)
    )]
    pub fn credit(&self, request: CreditDebit) -> LedgerResult<AccountInfo> {
        report("credit", self.try_credit(request))
    }

    fn try_credit(&self, request: CreditDebit) -> LedgerResult<AccountInfo> {
        let amount = parse_amount(request.amount)?;
        let number = parse_number(&request.account_number)
            .ok_or_else(|| not_found(&request.account_number))?;
        let key = parse_key(request.idempotency_key.as_deref())?;
        let fingerprint = format!("credit:{number}:{amount}");

        let info = self.store.run_atomic(|unit| -> LedgerResult<AccountInfo> {
            if let Some(replayed) = replay(unit, key.as_ref(), &fingerprint)? {
                return Ok(replayed);
            }

            let account = unit
                .get_for_update(&number)?
                .ok_or_else(|| not_found(number.as_str()))?;
            ensure_active(&account)?;

            let updated = unit.update(account.credited(amount)?)?;
            let info = updated.info();
            self.remember(unit, key.as_ref(), &fingerprint, &info)?;
            Ok(info)
        })?;

        info!(balance = %info.balance, "account credited");
        Ok(info)
    }

    #[instrument(
        skip(self, request),
        fields(account_number = %request.account_number, amount = %request.amount)
    )]
    pub fn debit(&self, request: CreditDebit) -> LedgerResult<AccountInfo> {
        report("debit", self.try_debit(request))
    }

    fn try_debit(&self, request: CreditDebit) -> LedgerResult<AccountInfo> {
        let amount = parse_amount(request.amount)?;
        let number = parse_number(&request.account_number)
            .ok_or_else(|| not_found(&request.account_number))?;
        let key = parse_key(request.idempotency_key.as_deref())?;
        let fingerprint = format!("debit:{number}:{amount}");

        let info = self.store.run_atomic(|unit| -> LedgerResult<AccountInfo> {
            if let Some(replayed) = replay(unit, key.as_ref(), &fingerprint)? {
                return Ok(replayed);
            }

            let account = unit
                .get_for_update(&number)?
                .ok_or_else(|| not_found(number.as_str()))?;
            ensure_active(&account)?;
            ensure_covers(&account, amount)?;

            let updated = unit.update(account.debited(amount)?)?;
            let info = updated.info();
            self.remember(unit, key.as_ref(), &fingerprint, &info)?;
            Ok(info)
        })?;

        info!(balance = %info.balance, "account debited");
        Ok(info)
    }

    /// Move funds between two accounts; returns the source projection.
    #[instrument(
        skip(self, request),
        fields(
            source = %request.source_account_number,
            destination = %request.destination_account_number,
            amount = %request.amount
        )
    )]
    pub fn transfer(&self, request: Transfer) -> LedgerResult<AccountInfo> {
        report("transfer", self.try_transfer(request))
    }

    fn try_transfer(&self, request: Transfer) -> LedgerResult<AccountInfo> {
        let amount = parse_amount(request.amount)?;
        let source_raw = request.source_account_number.trim();
        let destination_raw = request.destination_account_number.trim();
        if source_raw == destination_raw {
            return Err(LedgerError::SameAccount {
                account_number: source_raw.to_string(),
            });
        }

        let source = parse_number(source_raw).ok_or_else(|| LedgerError::SourceAccountNotFound {
            account_number: source_raw.to_string(),
        })?;
        let destination =
            parse_number(destination_raw).ok_or_else(|| LedgerError::DestinationAccountNotFound {
                account_number: destination_raw.to_string(),
            })?;
        let key = parse_key(request.idempotency_key.as_deref())?;
        let fingerprint = format!("transfer:{source}:{destination}:{amount}");

        let info = self.store.run_atomic(|unit| -> LedgerResult<AccountInfo> {
            if let Some(replayed) = replay(unit, key.as_ref(), &fingerprint)? {
                return Ok(replayed);
            }

            // Fixed global lock order keeps opposite transfers from deadlocking.
            let (first, second) = if source < destination {
                (&source, &destination)
            } else {
                (&destination, &source)
            };
            let first_snapshot = unit.get_for_update(first)?;
            let second_snapshot = unit.get_for_update(second)?;
            let (from, to) = if first == &source {
                (first_snapshot, second_snapshot)
            } else {
                (second_snapshot, first_snapshot)
            };

            let from = from.ok_or_else(|| LedgerError::SourceAccountNotFound {
                account_number: source.to_string(),
            })?;
            let to = to.ok_or_else(|| LedgerError::DestinationAccountNotFound {
                account_number: destination.to_string(),
            })?;
            ensure_active(&from)?;
            ensure_active(&to)?;
            ensure_covers(&from, amount)?;

            let from = unit.update(from.debited(amount)?)?;
            unit.update(to.credited(amount)?)?;

            let info = from.info();
            self.remember(unit, key.as_ref(), &fingerprint, &info)?;
            Ok(info)
        })?;

        info!(source_balance = %info.balance, "transfer completed");
        Ok(info)
    }

    /// Move an account through its lifecycle (ACTIVE, SUSPENDED, CLOSED).
    #[instrument(skip(self))]
    pub fn change_status(
        &self,
        account_number: &str,
        status: AccountStatus,
    ) -> LedgerResult<AccountInfo> {
        report("change_status", self.try_change_status(account_number, status))
    }

    fn try_change_status(
        &self,
        account_number: &str,
        status: AccountStatus,
    ) -> LedgerResult<AccountInfo> {
        let number = parse_number(account_number).ok_or_else(|| not_found(account_number))?;

        let info = self.store.run_atomic(|unit| -> LedgerResult<AccountInfo> {
            let account = unit
                .get_for_update(&number)?
                .ok_or_else(|| not_found(number.as_str()))?;
            let updated = unit.update(account.with_status(status)?)?;
            Ok(updated.info())
        })?;

        info!(account_number = %number, "account status changed");
        Ok(info)
    }

    /// Stage the outcome under the caller's key so a retry replays it.
    fn remember<U: AtomicUnit>(
        &self,
        unit: &mut U,
        key: Option<&IdempotencyKey>,
        fingerprint: &str,
        outcome: &AccountInfo,
    ) -> Result<(), StoreError> {
        let Some(key) = key else {
            return Ok(());
        };
        unit.record_outcome(IdempotencyRecord {
            key: key.clone(),
            fingerprint: fingerprint.to_string(),
            outcome: outcome.clone(),
            recorded_at: self.clock.now(),
        })
    }
}

/// Claim the key for this unit and return the stored outcome if it was seen before.
fn replay<U: AtomicUnit>(
    unit: &mut U,
    key: Option<&IdempotencyKey>,
    fingerprint: &str,
) -> LedgerResult<Option<AccountInfo>> {
    let Some(key) = key else {
        return Ok(None);
    };
    match unit.claim_idempotency_key(key)? {
        None => Ok(None),
        Some(record) if record.fingerprint == fingerprint => {
            debug!(idempotency_key = %key, "replaying recorded outcome");
            Ok(Some(record.outcome))
        }
        Some(_) => Err(LedgerError::IdempotencyKeyReused {
            key: key.to_string(),
        }),
    }
}

fn report<T>(operation: &'static str, result: LedgerResult<T>) -> LedgerResult<T> {
    if let Err(err) = &result {
        warn!(
            operation,
            code = err.code(),
            retryable = err.is_retryable(),
            error = %err,
            "ledger operation rejected"
        );
    }
    result
}

fn ensure_active(account: &Account) -> LedgerResult<()> {
    if !account.status().can_transact() {
        return Err(LedgerError::AccountNotActive {
            account: account.info(),
            status: account.status(),
        });
    }
    Ok(())
}

fn ensure_covers(account: &Account, amount: Amount) -> LedgerResult<()> {
    if !account.balance().covers(amount) {
        return Err(LedgerError::InsufficientFunds {
            account: account.info(),
            requested: amount,
        });
    }
    Ok(())
}

fn parse_amount(raw: Decimal) -> LedgerResult<Amount> {
    Amount::new(raw).map_err(LedgerError::invalid_amount)
}

/// Malformed numbers cannot name an existing account.
fn parse_number(raw: &str) -> Option<AccountNumber> {
    AccountNumber::parse(raw).ok()
}

fn parse_key(raw: Option<&str>) -> LedgerResult<Option<IdempotencyKey>> {
    raw.map(IdempotencyKey::parse).transpose().map_err(LedgerError::from)
}

fn not_found(account_number: &str) -> LedgerError {
    LedgerError::AccountNotFound {
        account_number: account_number.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use vaultline_accounts::ScriptedNumberSource;
    use vaultline_core::FixedClock;
    use vaultline_infra::{InMemoryAccountStore, NotificationOutbox};

    type TestLedger = Ledger<InMemoryAccountStore, ScriptedNumberSource>;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn ledger_with(suffixes: Vec<u32>, config: LedgerConfig) -> TestLedger {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(test_time()));
        let store = InMemoryAccountStore::with_parts(clock.clone(), config.lock_timeout());
        Ledger::new(store, ScriptedNumberSource::new(suffixes), config).with_clock(clock)
    }

    fn ledger() -> TestLedger {
        ledger_with(
            (100_001..100_100).collect(),
            LedgerConfig::default(),
        )
    }

    fn request(email: &str) -> OpenAccount {
        OpenAccount {
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            other_name: Some("Ngozi".into()),
            email: email.into(),
            ..OpenAccount::default()
        }
    }

    fn open(ledger: &TestLedger, email: &str) -> String {
        ledger
            .create_account(request(email))
            .unwrap()
            .account_number
            .to_string()
    }

    #[test]
    fn create_account_opens_empty_and_queues_welcome() {
        let ledger = ledger();
        let info = ledger.create_account(request("  Ada@Example.com ")).unwrap();

        assert_eq!(info.account_number.as_str(), "2026100001");
        assert_eq!(info.account_name, "Ada Obi Ngozi");
        assert!(info.balance.is_zero());

        let pending = ledger.store().drain(10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].recipient, "ada@example.com");
        assert_eq!(pending[0].subject, "Account creation");
        assert!(pending[0].body.contains("Account Number: 2026100001"));
    }

    #[test]
    fn duplicate_identity_is_rejected_without_side_effects() {
        let ledger = ledger();
        open(&ledger, "ada@example.com");

        let err = ledger.create_account(request("ADA@example.com")).unwrap_err();
        assert!(matches!(err, LedgerError::IdentityAlreadyRegistered { .. }));
        assert_eq!(err.code(), "001");
        assert_eq!(ledger.store().drain(10).unwrap().len(), 1);
    }

    #[test]
    fn number_collisions_retry_then_exhaust() {
        let config = LedgerConfig {
            account_number_attempts: 3,
            ..LedgerConfig::default()
        };
        // Scripted source repeats its last value forever.
        let ledger = ledger_with(vec![100_001, 100_001, 100_002], config);

        let first = open(&ledger, "a@example.com");
        let second = open(&ledger, "b@example.com");
        assert_eq!(first, "2026100001");
        assert_eq!(second, "2026100002");

        let err = ledger.create_account(request("c@example.com")).unwrap_err();
        assert_eq!(err, LedgerError::AccountNumberExhausted { attempts: 3 });
        assert!(ledger.balance_enquiry("2026100003").is_err());
    }

    #[test]
    fn invalid_open_request_is_rejected() {
        let ledger = ledger();
        let mut bad = request("not-an-email");
        assert!(matches!(
            ledger.create_account(bad.clone()).unwrap_err(),
            LedgerError::InvalidRequest(_)
        ));
        bad.email = "x@y.com".into();
        bad.first_name = "  ".into();
        assert_eq!(ledger.create_account(bad).unwrap_err().code(), "016");
    }

    #[test]
    fn enquiries_report_missing_accounts() {
        let ledger = ledger();
        let number = open(&ledger, "ada@example.com");

        assert_eq!(ledger.name_enquiry(&number).unwrap(), "Ada Obi Ngozi");
        assert!(matches!(
            ledger.balance_enquiry("2026999999").unwrap_err(),
            LedgerError::AccountNotFound { .. }
        ));
        assert!(matches!(
            ledger.name_enquiry("garbage").unwrap_err(),
            LedgerError::AccountNotFound { .. }
        ));
    }

    #[test]
    fn credit_and_debit_move_the_balance() {
        let ledger = ledger();
        let number = open(&ledger, "ada@example.com");

        let credited = ledger.credit(CreditDebit::new(&number, dec!(100))).unwrap();
        assert_eq!(credited.balance.as_decimal(), dec!(100.00));

        let debited = ledger.debit(CreditDebit::new(&number, dec!(40.50))).unwrap();
        assert_eq!(debited.balance.as_decimal(), dec!(59.50));
    }

    #[test]
    fn overdraft_is_rejected_with_current_balance() {
        let ledger = ledger();
        let number = open(&ledger, "ada@example.com");
        ledger.credit(CreditDebit::new(&number, dec!(100))).unwrap();

        let err = ledger.debit(CreditDebit::new(&number, dec!(150))).unwrap_err();
        assert_eq!(err.account().unwrap().balance.as_decimal(), dec!(100));
        assert_eq!(
            ledger.balance_enquiry(&number).unwrap().balance.as_decimal(),
            dec!(100)
        );
    }

    #[test]
    fn bad_amounts_are_invalid() {
        let ledger = ledger();
        let number = open(&ledger, "ada@example.com");

        for amount in [dec!(0), dec!(-5), dec!(1.005)] {
            let err = ledger.credit(CreditDebit::new(&number, amount)).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidAmount { .. }), "{amount}");
        }
    }

    #[test]
    fn transfer_validates_before_locking() {
        let ledger = ledger();
        let a = open(&ledger, "a@example.com");
        let b = open(&ledger, "b@example.com");

        assert!(matches!(
            ledger.transfer(Transfer::new(&a, &a, dec!(1))).unwrap_err(),
            LedgerError::SameAccount { .. }
        ));
        assert!(matches!(
            ledger.transfer(Transfer::new(&a, &b, dec!(0))).unwrap_err(),
            LedgerError::InvalidAmount { .. }
        ));
        assert!(matches!(
            ledger.transfer(Transfer::new("2026999999", &b, dec!(1))).unwrap_err(),
            LedgerError::SourceAccountNotFound { .. }
        ));
        assert!(matches!(
            ledger.transfer(Transfer::new(&a, "2026999999", dec!(1))).unwrap_err(),
            LedgerError::DestinationAccountNotFound { .. }
        ));
    }

    #[test]
    fn transfer_works_in_either_lock_order() {
        let ledger = ledger();
        let a = open(&ledger, "a@example.com");
        let b = open(&ledger, "b@example.com");
        ledger.credit(CreditDebit::new(&b, dec!(30))).unwrap();

        // b > a, so the source is locked second.
        let source = ledger.transfer(Transfer::new(&b, &a, dec!(10))).unwrap();
        assert_eq!(source.balance.as_decimal(), dec!(20));
        assert_eq!(ledger.balance_enquiry(&a).unwrap().balance.as_decimal(), dec!(10));
    }

    #[test]
    fn suspended_accounts_cannot_transact() {
        let ledger = ledger();
        let a = open(&ledger, "a@example.com");
        let b = open(&ledger, "b@example.com");
        ledger.credit(CreditDebit::new(&a, dec!(10))).unwrap();
        ledger.change_status(&b, AccountStatus::Suspended).unwrap();

        let err = ledger.transfer(Transfer::new(&a, &b, dec!(5))).unwrap_err();
        assert_eq!(err.code(), "014");
        assert_eq!(ledger.balance_enquiry(&a).unwrap().balance.as_decimal(), dec!(10));

        // Enquiries still work for any status.
        assert!(ledger.balance_enquiry(&b).is_ok());
        ledger.change_status(&b, AccountStatus::Active).unwrap();
        ledger.transfer(Transfer::new(&a, &b, dec!(5))).unwrap();
    }

    #[test]
    fn closing_requires_an_empty_account() {
        let ledger = ledger();
        let a = open(&ledger, "a@example.com");
        ledger.credit(CreditDebit::new(&a, dec!(1))).unwrap();

        assert!(matches!(
            ledger.change_status(&a, AccountStatus::Closed).unwrap_err(),
            LedgerError::InvalidRequest(_)
        ));
        ledger.debit(CreditDebit::new(&a, dec!(1))).unwrap();
        ledger.change_status(&a, AccountStatus::Closed).unwrap();
        assert!(ledger.change_status(&a, AccountStatus::Active).is_err());
    }

    #[test]
    fn idempotent_credit_replays_instead_of_reapplying() {
        let ledger = ledger();
        let a = open(&ledger, "a@example.com");
        let request = CreditDebit::new(&a, dec!(25)).with_idempotency_key("req-1");

        let first = ledger.credit(request.clone()).unwrap();
        let again = ledger.credit(request).unwrap();
        assert_eq!(first, again);
        assert_eq!(ledger.balance_enquiry(&a).unwrap().balance.as_decimal(), dec!(25));

        let reused = ledger
            .debit(CreditDebit::new(&a, dec!(25)).with_idempotency_key("req-1"))
            .unwrap_err();
        assert!(matches!(reused, LedgerError::IdempotencyKeyReused { .. }));
    }

    #[test]
    fn failed_keyed_request_does_not_burn_the_key() {
        let ledger = ledger();
        let a = open(&ledger, "a@example.com");
        let debit = CreditDebit::new(&a, dec!(10)).with_idempotency_key("req-2");

        assert!(ledger.debit(debit.clone()).is_err());
        ledger.credit(CreditDebit::new(&a, dec!(10))).unwrap();
        let info = ledger.debit(debit).unwrap();
        assert!(info.balance.is_zero());
    }

    #[test]
    fn keyed_open_replays_the_first_account() {
        let ledger = ledger();
        let keyed = OpenAccount {
            idempotency_key: Some("open-1".into()),
            ..request("ada@example.com")
        };

        let first = ledger.create_account(keyed.clone()).unwrap();
        let again = ledger.create_account(keyed).unwrap();
        assert_eq!(first, again);
        assert_eq!(ledger.store().drain(10).unwrap().len(), 1);

        // Without the key, or under another key, it is a duplicate.
        assert_eq!(
            ledger.create_account(request("ada@example.com")).unwrap_err().code(),
            "001"
        );
        let other_key = OpenAccount {
            idempotency_key: Some("open-2".into()),
            ..request("ada@example.com")
        };
        assert!(matches!(
            ledger.create_account(other_key).unwrap_err(),
            LedgerError::IdentityAlreadyRegistered { .. }
        ));

        // The same key for somebody else is a misuse.
        let reused = OpenAccount {
            idempotency_key: Some("open-1".into()),
            ..request("bea@example.com")
        };
        assert!(matches!(
            ledger.create_account(reused).unwrap_err(),
            LedgerError::IdempotencyKeyReused { .. }
        ));
    }

    #[test]
    fn balances_at_the_decimal_limit_do_not_round() {
        let ledger = ledger();
        let a = open(&ledger, "a@example.com");
        let b = open(&ledger, "b@example.com");
        let near_max = dec!(792281625142643375935439503.35);
        ledger.credit(CreditDebit::new(&a, dec!(0.01))).unwrap();
        ledger.credit(CreditDebit::new(&b, near_max)).unwrap();

        let err = ledger.transfer(Transfer::new(&a, &b, dec!(0.01))).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRequest(_)), "{err:?}");
        assert_eq!(ledger.balance_enquiry(&a).unwrap().balance.as_decimal(), dec!(0.01));
        let held = ledger.balance_enquiry(&b).unwrap().balance.as_decimal();
        assert_eq!(held, near_max);
        assert_eq!(held.scale(), 2);

        assert!(matches!(
            ledger.credit(CreditDebit::new(&b, dec!(0.01))).unwrap_err(),
            LedgerError::InvalidRequest(_)
        ));
        assert!(matches!(
            ledger.credit(CreditDebit::new(&a, Decimal::MAX)).unwrap_err(),
            LedgerError::InvalidAmount { .. }
        ));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Credit(usize, i64),
        Debit(usize, i64),
        Transfer(usize, usize, i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..3usize, 1..10_000i64).prop_map(|(a, c)| Op::Credit(a, c)),
            (0..3usize, 1..10_000i64).prop_map(|(a, c)| Op::Debit(a, c)),
            (0..3usize, 0..3usize, 1..10_000i64).prop_map(|(a, b, c)| Op::Transfer(a, b, c)),
        ]
    }

    proptest! {
        #[test]
        fn balances_stay_non_negative_and_value_is_conserved(ops in prop::collection::vec(op(), 1..40)) {
            let ledger = ledger();
            let accounts: Vec<String> = (0..3)
                .map(|i| open(&ledger, &format!("p{i}@example.com")))
                .collect();
            let mut expected_total = Decimal::ZERO;

            for op in ops {
                match op {
                    Op::Credit(a, cents) => {
                        let amount = Decimal::new(cents, 2);
                        ledger.credit(CreditDebit::new(&accounts[a], amount)).unwrap();
                        expected_total += amount;
                    }
                    Op::Debit(a, cents) => {
                        let amount = Decimal::new(cents, 2);
                        if ledger.debit(CreditDebit::new(&accounts[a], amount)).is_ok() {
                            expected_total -= amount;
                        }
                    }
                    Op::Transfer(a, b, cents) => {
                        let amount = Decimal::new(cents, 2);
                        let _ = ledger.transfer(Transfer::new(&accounts[a], &accounts[b], amount));
                    }
                }

                let mut total = Decimal::ZERO;
                for number in &accounts {
                    let balance = ledger.balance_enquiry(number).unwrap().balance.as_decimal();
                    prop_assert!(balance >= Decimal::ZERO);
                    total += balance;
                }
                prop_assert_eq!(total, expected_total);
            }
        }
    }
}
