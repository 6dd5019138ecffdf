//! Configuration loading and representation.
//!
//! Every knob has a default; environment variables (`VAULTLINE_*`) or a TOML file
//! override them.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_LOCK_TIMEOUT_MS: &str = "VAULTLINE_LOCK_TIMEOUT_MS";
pub const ENV_ACCOUNT_NUMBER_ATTEMPTS: &str = "VAULTLINE_ACCOUNT_NUMBER_ATTEMPTS";
pub const ENV_OUTBOX_BATCH_SIZE: &str = "VAULTLINE_OUTBOX_BATCH_SIZE";
pub const ENV_OUTBOX_MAX_ATTEMPTS: &str = "VAULTLINE_OUTBOX_MAX_ATTEMPTS";
pub const ENV_RELAY_POLL_INTERVAL_MS: &str = "VAULTLINE_RELAY_POLL_INTERVAL_MS";
pub const ENV_MAIL_SENDER: &str = "VAULTLINE_MAIL_SENDER";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: cannot parse '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid config file: {0}")]
    File(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Bounded wait for a per-account lock inside an atomic unit.
    pub lock_timeout_ms: u64,
    /// Account-number draws before account creation gives up.
    pub account_number_attempts: u32,
    pub outbox_batch_size: usize,
    /// Failed deliveries before an intent is marked FAILED.
    pub outbox_max_attempts: u32,
    pub relay_poll_interval_ms: u64,
    pub mail_sender: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2_000,
            account_number_attempts: 10,
            outbox_batch_size: 50,
            outbox_max_attempts: 5,
            relay_poll_interval_ms: 500,
            mail_sender: "no-reply@vaultline.local".to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn relay_poll_interval(&self) -> Duration {
        Duration::from_millis(self.relay_poll_interval_ms)
    }

    /// Defaults overridden by `VAULTLINE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup(ENV_LOCK_TIMEOUT_MS) {
            config.lock_timeout_ms = parse(ENV_LOCK_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_ACCOUNT_NUMBER_ATTEMPTS) {
            config.account_number_attempts = parse(ENV_ACCOUNT_NUMBER_ATTEMPTS, &v)?;
        }
        if let Some(v) = lookup(ENV_OUTBOX_BATCH_SIZE) {
            config.outbox_batch_size = parse(ENV_OUTBOX_BATCH_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_OUTBOX_MAX_ATTEMPTS) {
            config.outbox_max_attempts = parse(ENV_OUTBOX_MAX_ATTEMPTS, &v)?;
        }
        if let Some(v) = lookup(ENV_RELAY_POLL_INTERVAL_MS) {
            config.relay_poll_interval_ms = parse(ENV_RELAY_POLL_INTERVAL_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_MAIL_SENDER) {
            config.mail_sender = v.trim().to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|e| ConfigError::File(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Zero("lock_timeout_ms"));
        }
        if self.account_number_attempts == 0 {
            return Err(ConfigError::Zero("account_number_attempts"));
        }
        if self.outbox_batch_size == 0 {
            return Err(ConfigError::Zero("outbox_batch_size"));
        }
        if self.outbox_max_attempts == 0 {
            return Err(ConfigError::Zero("outbox_max_attempts"));
        }
        Ok(())
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.lock_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn env_overrides_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[
            (ENV_LOCK_TIMEOUT_MS, "250"),
            (ENV_ACCOUNT_NUMBER_ATTEMPTS, " 3 "),
            (ENV_MAIL_SENDER, "bank@example.com"),
        ]))
        .unwrap();
        assert_eq!(config.lock_timeout_ms, 250);
        assert_eq!(config.account_number_attempts, 3);
        assert_eq!(config.mail_sender, "bank@example.com");
    }

    #[test]
    fn garbage_is_reported_with_the_variable() {
        let err = LedgerConfig::from_lookup(lookup(&[(ENV_OUTBOX_BATCH_SIZE, "lots")])).unwrap_err();
        match err {
            ConfigError::Invalid { var, value, .. } => {
                assert_eq!(var, ENV_OUTBOX_BATCH_SIZE);
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_attempts_are_rejected() {
        let err = LedgerConfig::from_lookup(lookup(&[(ENV_ACCOUNT_NUMBER_ATTEMPTS, "0")])).unwrap_err();
        assert_eq!(err, ConfigError::Zero("account_number_attempts"));
    }

    #[test]
    fn toml_keeps_defaults_for_missing_keys() {
        let config = LedgerConfig::from_toml_str("lock_timeout_ms = 100\n").unwrap();
        assert_eq!(config.lock_timeout_ms, 100);
        assert_eq!(config.outbox_max_attempts, 5);
    }
}
