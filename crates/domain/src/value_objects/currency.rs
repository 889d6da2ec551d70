//! Currency value object with the application-wide balance cap

use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest balance any user may hold. Grants beyond it are discarded.
pub const CURRENCY_CAP: u64 = 999_999_999;

/// A spendable currency amount, always within `0..=CURRENCY_CAP`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct Currency(u64);

impl Currency {
    pub const ZERO: Currency = Currency(0);
    pub const MAX: Currency = Currency(CURRENCY_CAP);

    /// Create an amount, clamping anything above the cap.
    pub fn new(amount: u64) -> Self {
        Self(amount.min(CURRENCY_CAP))
    }

    pub fn amount(self) -> u64 {
        self.0
    }

    /// Add `other`, saturating at [`CURRENCY_CAP`].
    pub fn saturating_add(self, other: Currency) -> Currency {
        Currency(self.0.saturating_add(other.0).min(CURRENCY_CAP))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_capped(self) -> bool {
        self.0 == CURRENCY_CAP
    }
}

impl From<u64> for Currency {
    fn from(amount: u64) -> Self {
        Self::new(amount)
    }
}

impl From<Currency> for u64 {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
