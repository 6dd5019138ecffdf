use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vaultline_core::{AccountId, Amount, DomainError, DomainResult, Entity, Money, ValueObject};

use crate::number::AccountNumber;
use crate::request::{IdentityKey, OpenAccount};

/// Account status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    Active,
    Suspended,
    Closed,
}

impl AccountStatus {
    /// Only active accounts can be credited, debited or take part in a transfer.
    pub fn can_transact(self) -> bool {
        self == AccountStatus::Active
    }

    /// CLOSED is terminal.
    pub fn can_transition_to(self, next: AccountStatus) -> bool {
        use AccountStatus::*;
        matches!(
            (self, next),
            (Active, Suspended) | (Suspended, Active) | (Active, Closed) | (Suspended, Closed)
        )
    }
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Suspended => "SUSPENDED",
            AccountStatus::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

/// Holder name as captured at opening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerName {
    pub first: String,
    pub last: String,
    pub other: Option<String>,
}

impl OwnerName {
    /// "First Last Other", skipping blank parts.
    pub fn display(&self) -> String {
        [Some(self.first.as_str()), Some(self.last.as_str()), self.other.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ValueObject for OwnerName {}

/// Contact information for an account holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: String,
    pub phone: Option<String>,
    pub alternative_phone: Option<String>,
    pub address: Option<String>,
}

/// Descriptive holder attributes with no bearing on ledger rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub gender: Option<String>,
    pub state_of_origin: Option<String>,
}

/// Public projection of an account: what callers are shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_number: AccountNumber,
    pub account_name: String,
    pub balance: Money,
}

/// Account snapshot.
///
/// Snapshots are values: `credited`, `debited` and `with_status` return a new
/// snapshot and leave the original untouched. `version`, `created_at` and
/// `updated_at` are owned by the store and only change when a snapshot is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    account_number: AccountNumber,
    identity: IdentityKey,
    owner: OwnerName,
    contact: ContactInfo,
    profile: OwnerProfile,
    status: AccountStatus,
    balance: Money,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Account {
    /// Fresh ACTIVE account with a zero balance, not yet stored.
    pub fn open(
        id: AccountId,
        account_number: AccountNumber,
        identity: IdentityKey,
        request: &OpenAccount,
        now: DateTime<Utc>,
    ) -> Self {
        let trimmed = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            id,
            account_number,
            contact: ContactInfo {
                email: identity.as_str().to_string(),
                phone: trimmed(&request.phone_number),
                alternative_phone: trimmed(&request.alternative_phone_number),
                address: trimmed(&request.address),
            },
            identity,
            owner: OwnerName {
                first: request.first_name.trim().to_string(),
                last: request.last_name.trim().to_string(),
                other: trimmed(&request.other_name),
            },
            profile: OwnerProfile {
                gender: trimmed(&request.gender),
                state_of_origin: trimmed(&request.state_of_origin),
            },
            status: AccountStatus::Active,
            balance: Money::zero(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id_typed(&self) -> AccountId {
        self.id
    }

    pub fn account_number(&self) -> &AccountNumber {
        &self.account_number
    }

    pub fn identity(&self) -> &IdentityKey {
        &self.identity
    }

    pub fn owner(&self) -> &OwnerName {
        &self.owner
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn profile(&self) -> &OwnerProfile {
        &self.profile
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn display_name(&self) -> String {
        self.owner.display()
    }

    pub fn info(&self) -> AccountInfo {
        AccountInfo {
            account_number: self.account_number.clone(),
            account_name: self.display_name(),
            balance: self.balance,
        }
    }

    fn ensure_can_transact(&self) -> DomainResult<()> {
        if !self.status.can_transact() {
            return Err(DomainError::invariant(format!(
                "account {} is {}",
                self.account_number, self.status
            )));
        }
        Ok(())
    }

    pub fn credited(&self, amount: Amount) -> DomainResult<Account> {
        self.ensure_can_transact()?;
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| DomainError::invariant("balance overflow"))?;
        Ok(Account {
            balance,
            ..self.clone()
        })
    }

    pub fn debited(&self, amount: Amount) -> DomainResult<Account> {
        self.ensure_can_transact()?;
        let balance = self.balance.checked_sub(amount).ok_or_else(|| {
            DomainError::invariant(format!(
                "debit of {amount} exceeds balance {} of account {}",
                self.balance, self.account_number
            ))
        })?;
        Ok(Account {
            balance,
            ..self.clone()
        })
    }

    pub fn with_status(&self, next: AccountStatus) -> DomainResult<Account> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "account {} cannot move from {} to {}",
                self.account_number, self.status, next
            )));
        }
        if next == AccountStatus::Closed && !self.balance.is_zero() {
            return Err(DomainError::invariant(format!(
                "account {} still holds {}",
                self.account_number, self.balance
            )));
        }
        Ok(Account {
            status: next,
            ..self.clone()
        })
    }

    /// Store-side stamp for a first write.
    pub fn into_inserted(self, at: DateTime<Utc>) -> Account {
        Account {
            version: 1,
            created_at: at,
            updated_at: at,
            ..self
        }
    }

    /// Store-side stamp for a successful update.
    pub fn into_updated(self, at: DateTime<Utc>) -> Account {
        Account {
            version: self.version + 1,
            updated_at: at,
            ..self
        }
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_account() -> Account {
        let request = OpenAccount {
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            other_name: Some("Nkem".into()),
            email: "ada@example.com".into(),
            phone_number: Some(" 0800 ".into()),
            address: Some("   ".into()),
            ..OpenAccount::default()
        };
        let identity = request.validate().unwrap();
        Account::open(
            AccountId::new(),
            AccountNumber::parse("2026123456").unwrap(),
            identity,
            &request,
            test_time(),
        )
    }

    fn amount(v: Decimal) -> Amount {
        Amount::new(v).unwrap()
    }

    #[test]
    fn opens_active_with_zero_balance() {
        let account = test_account();
        assert_eq!(account.status(), AccountStatus::Active);
        assert!(account.balance().is_zero());
        assert_eq!(account.version(), 0);
        assert_eq!(account.display_name(), "Ada Obi Nkem");
        assert_eq!(account.contact().phone.as_deref(), Some("0800"));
        assert_eq!(account.contact().address, None);
    }

    #[test]
    fn credit_returns_new_snapshot() {
        let account = test_account();
        let credited = account.credited(amount(dec!(100))).unwrap();
        assert_eq!(credited.balance().as_decimal(), dec!(100.00));
        assert!(account.balance().is_zero());
    }

    #[test]
    fn overdraft_is_rejected() {
        let account = test_account().credited(amount(dec!(100))).unwrap();
        let err = account.debited(amount(dec!(150))).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        let drained = account.debited(amount(dec!(100))).unwrap();
        assert!(drained.balance().is_zero());
    }

    #[test]
    fn suspended_accounts_cannot_transact() {
        let suspended = test_account().with_status(AccountStatus::Suspended).unwrap();
        assert!(suspended.credited(amount(dec!(1))).is_err());
        let reactivated = suspended.with_status(AccountStatus::Active).unwrap();
        assert!(reactivated.credited(amount(dec!(1))).is_ok());
    }

    #[test]
    fn closing_requires_zero_balance_and_is_terminal() {
        let funded = test_account().credited(amount(dec!(5))).unwrap();
        assert!(funded.with_status(AccountStatus::Closed).is_err());

        let closed = test_account().with_status(AccountStatus::Closed).unwrap();
        assert!(closed.with_status(AccountStatus::Active).is_err());
        assert!(closed.with_status(AccountStatus::Suspended).is_err());
    }

    #[test]
    fn store_stamps_bump_version() {
        let at = test_time();
        let stored = test_account().into_inserted(at);
        assert_eq!(stored.version(), 1);
        assert_eq!(stored.created_at(), at);
        let updated = stored.credited(amount(dec!(1))).unwrap().into_updated(at);
        assert_eq!(updated.version(), 2);
    }

    #[test]
    fn info_projects_number_name_balance() {
        let info = test_account().credited(amount(dec!(12.5))).unwrap().info();
        assert_eq!(info.account_number.as_str(), "2026123456");
        assert_eq!(info.account_name, "Ada Obi Nkem");
        assert_eq!(info.balance.as_decimal(), dec!(12.50));
    }
}
