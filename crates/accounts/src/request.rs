use serde::{Deserialize, Serialize};

use vaultline_core::{DomainError, DomainResult, ValueObject};

/// Unique contact identity of an account holder (normalized email).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Trims and lower-cases an email address.
    pub fn parse(email: &str) -> DomainResult<Self> {
        let normalized = email.trim().to_lowercase();
        let valid = match normalized.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };
        if !valid {
            return Err(DomainError::validation(format!("'{email}' is not an email address")));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdentityKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IdentityKey> for String {
    fn from(value: IdentityKey) -> Self {
        value.0
    }
}

impl core::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for IdentityKey {}

/// Request to open a new account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenAccount {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub other_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub state_of_origin: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub alternative_phone_number: Option<String>,
    /// Retrying with the same key replays the account opened the first time.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl OpenAccount {
    /// Check the fields the ledger depends on and return the holder's identity key.
    pub fn validate(&self) -> DomainResult<IdentityKey> {
        if self.first_name.trim().is_empty() {
            return Err(DomainError::validation("first name is required"));
        }
        if self.last_name.trim().is_empty() {
            return Err(DomainError::validation("last name is required"));
        }
        IdentityKey::parse(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> OpenAccount {
        OpenAccount {
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            email: "  Ada.Obi@Example.COM ".into(),
            ..OpenAccount::default()
        }
    }

    #[test]
    fn identity_is_normalized() {
        let key = request().validate().unwrap();
        assert_eq!(key.as_str(), "ada.obi@example.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "plain", "@example.com", "ada@", "a@b@c"] {
            assert!(IdentityKey::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn names_are_required() {
        let mut req = request();
        req.last_name = "   ".into();
        assert!(matches!(req.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn optional_fields_default_when_absent() {
        let req: OpenAccount = serde_json::from_str(
            r#"{"first_name":"Ada","last_name":"Obi","email":"ada@example.com"}"#,
        )
        .unwrap();
        assert_eq!(req.other_name, None);
        assert_eq!(req.phone_number, None);
        assert_eq!(req.idempotency_key, None);
    }

    #[test]
    fn deserialized_identity_is_normalized_and_checked() {
        let key: IdentityKey = serde_json::from_str(r#"" Ada@Example.com""#).unwrap();
        assert_eq!(key.as_str(), "ada@example.com");
        assert!(serde_json::from_str::<IdentityKey>(r#""no-at-sign""#).is_err());
    }
}
