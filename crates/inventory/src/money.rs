//! Monetary value object.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use atelier_core::ValueObject;

use crate::error::{InventoryError, InventoryResult};

/// ISO 4217 currency code (three ASCII letters, stored uppercase).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(raw: &str) -> InventoryResult<Self> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.len() != 3 || !normalized.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(InventoryError::invalid_money(format!(
                "currency must be a three-letter ISO code, got '{raw}'"
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = InventoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl ValueObject for CurrencyCode {}

/// Non-negative monetary amount in a single currency.
///
/// The amount is normalized to scale 2 on construction, rounding half-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: CurrencyCode,
}

impl Money {
    pub fn new(amount: Decimal, currency: CurrencyCode) -> InventoryResult<Self> {
        if amount < Decimal::ZERO {
            return Err(InventoryError::invalid_money(format!(
                "amount cannot be negative, got {amount}"
            )));
        }
        let amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Ok(Self { amount, currency })
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

impl ValueObject for Money {}
