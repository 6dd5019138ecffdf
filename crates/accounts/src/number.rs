//! Account numbers and the policy that mints them.
//!
//! An account number is the 4-digit year of opening followed by a 6-digit suffix
//! (`2026` + `483920` = `2026483920`). Suffixes come from an injected
//! [`NumberSource`]; uniqueness is checked by the caller against the store, since
//! two draws can collide.

use std::collections::VecDeque;

use parking_lot::Mutex;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use vaultline_core::{DomainError, DomainResult, ValueObject};

pub const SUFFIX_MIN: u32 = 100_000;
pub const SUFFIX_MAX: u32 = 999_999;

const NUMBER_LEN: usize = 10;

/// Human-presentable, globally unique account number.
///
/// Ordering is lexicographic, which is also the global lock order used for
/// multi-account operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        if raw.len() != NUMBER_LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::invalid_id(format!(
                "account number must be {NUMBER_LEN} digits, got '{raw}'"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(value: AccountNumber) -> Self {
        value.0
    }
}

impl core::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for AccountNumber {}

/// Source of 6-digit account-number suffixes.
pub trait NumberSource: Send + Sync {
    /// Next suffix; values outside `SUFFIX_MIN..=SUFFIX_MAX` are folded into range
    /// by the policy.
    fn next_suffix(&self) -> u32;
}

impl<N> NumberSource for std::sync::Arc<N>
where
    N: NumberSource + ?Sized,
{
    fn next_suffix(&self) -> u32 {
        (**self).next_suffix()
    }
}

/// Uniformly random suffixes.
#[derive(Debug)]
pub struct RandomNumberSource {
    rng: Mutex<StdRng>,
}

impl RandomNumberSource {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence, for reproducible replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomNumberSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NumberSource for RandomNumberSource {
    fn next_suffix(&self) -> u32 {
        self.rng.lock().gen_range(SUFFIX_MIN..=SUFFIX_MAX)
    }
}

/// Hands out a fixed list of suffixes, then repeats the last one forever.
#[derive(Debug)]
pub struct ScriptedNumberSource {
    queue: Mutex<VecDeque<u32>>,
    last: Mutex<u32>,
}

impl ScriptedNumberSource {
    pub fn new(suffixes: impl IntoIterator<Item = u32>) -> Self {
        Self {
            queue: Mutex::new(suffixes.into_iter().collect()),
            last: Mutex::new(SUFFIX_MIN),
        }
    }
}

impl NumberSource for ScriptedNumberSource {
    fn next_suffix(&self) -> u32 {
        let mut last = self.last.lock();
        if let Some(next) = self.queue.lock().pop_front() {
            *last = next;
        }
        *last
    }
}

/// Year-prefix + suffix numbering policy.
#[derive(Debug)]
pub struct AccountNumberPolicy<N> {
    source: N,
}

impl<N: NumberSource> AccountNumberPolicy<N> {
    pub fn new(source: N) -> Self {
        Self { source }
    }

    /// Mint a candidate number for an account opened in `year`.
    ///
    /// The candidate is not guaranteed unique.
    pub fn generate(&self, year: i32) -> AccountNumber {
        let raw = self.source.next_suffix();
        let suffix = if (SUFFIX_MIN..=SUFFIX_MAX).contains(&raw) {
            raw
        } else {
            SUFFIX_MIN + raw % (SUFFIX_MAX - SUFFIX_MIN + 1)
        };
        let year = year.clamp(1000, 9999);
        AccountNumber(format!("{year:04}{suffix:06}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_accepts_ten_digits_only() {
        assert!(AccountNumber::parse("2026123456").is_ok());
        assert!(AccountNumber::parse(" 2026123456 ").is_ok());
        assert!(AccountNumber::parse("202612345").is_err());
        assert!(AccountNumber::parse("20261234567").is_err());
        assert!(AccountNumber::parse("2026-23456").is_err());
        assert!(AccountNumber::parse("").is_err());
    }

    #[test]
    fn policy_prefixes_the_year() {
        let policy = AccountNumberPolicy::new(ScriptedNumberSource::new([483_920]));
        assert_eq!(policy.generate(2026).as_str(), "2026483920");
    }

    #[test]
    fn scripted_source_repeats_last_value() {
        let source = ScriptedNumberSource::new([111_111, 222_222]);
        assert_eq!(source.next_suffix(), 111_111);
        assert_eq!(source.next_suffix(), 222_222);
        assert_eq!(source.next_suffix(), 222_222);
    }

    #[test]
    fn seeded_sources_agree() {
        let a = RandomNumberSource::seeded(7);
        let b = RandomNumberSource::seeded(7);
        for _ in 0..16 {
            assert_eq!(a.next_suffix(), b.next_suffix());
        }
    }

    #[test]
    fn ordering_is_lexicographic() {
        let low = AccountNumber::parse("2025999999").unwrap();
        let high = AccountNumber::parse("2026100000").unwrap();
        assert!(low < high);
    }

    proptest! {
        /// Whatever the source yields, the minted number is a valid account number.
        #[test]
        fn generated_numbers_always_parse(raw in any::<u32>(), year in 2000i32..2100) {
            struct Fixed(u32);
            impl NumberSource for Fixed {
                fn next_suffix(&self) -> u32 { self.0 }
            }

            let number = AccountNumberPolicy::new(Fixed(raw)).generate(year);
            prop_assert!(AccountNumber::parse(number.as_str()).is_ok());
            prop_assert!(number.as_str().starts_with(&year.to_string()));
        }
    }
}
