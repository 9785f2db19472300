//! Stock keeping unit identifier.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use atelier_core::ValueObject;

use crate::error::{InventoryError, InventoryResult};

const SKU_MIN_LEN: usize = 3;
const SKU_MAX_LEN: usize = 64;

/// Normalized catalog identifier for an item.
///
/// Input is trimmed and uppercased; the result must be 3-64 characters
/// matching `[A-Z0-9][A-Z0-9._-]*`. Used as a natural secondary key:
/// creating an item fails when its SKU is already taken.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn new(raw: &str) -> InventoryResult<Self> {
        let normalized = raw.trim().to_ascii_uppercase();

        if normalized.len() < SKU_MIN_LEN || normalized.len() > SKU_MAX_LEN {
            return Err(InventoryError::invalid_sku(format!(
                "sku must be {SKU_MIN_LEN}-{SKU_MAX_LEN} characters, got {} ('{raw}')",
                normalized.len()
            )));
        }

        let Some((first, rest)) = normalized.as_bytes().split_first() else {
            return Err(InventoryError::invalid_sku("sku cannot be empty"));
        };
        if !first.is_ascii_uppercase() && !first.is_ascii_digit() {
            return Err(InventoryError::invalid_sku(format!(
                "sku must start with a letter or digit ('{raw}')"
            )));
        }
        if !rest
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || matches!(b, b'.' | b'_' | b'-'))
        {
            return Err(InventoryError::invalid_sku(format!(
                "sku may only contain letters, digits, '.', '_' and '-' ('{raw}')"
            )));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Sku {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Sku {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Sku {
    type Error = InventoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Sku> for String {
    fn from(value: Sku) -> Self {
        value.0
    }
}

impl ValueObject for Sku {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let sku = Sku::new("  tee-basic.01 ").unwrap();
        assert_eq!(sku.as_str(), "TEE-BASIC.01");
    }

    #[test]
    fn rejects_out_of_range_lengths() {
        assert!(Sku::new("AB").is_err());
        assert!(Sku::new(&"A".repeat(65)).is_err());
        assert!(Sku::new(&"A".repeat(64)).is_ok());
    }

    #[test]
    fn rejects_leading_separator() {
        assert!(Sku::new("-ABC").is_err());
        assert!(Sku::new(".ABC").is_err());
        assert!(Sku::new("9ABC").is_ok());
    }

    #[test]
    fn rejects_forbidden_characters() {
        assert!(Sku::new("AB C").is_err());
        assert!(Sku::new("AB/C").is_err());
        assert!(Sku::new("AB_C-1.X").is_ok());
    }

    #[test]
    fn serde_round_trip_re_validates() {
        let sku = Sku::new("DRESS-22").unwrap();
        let json = serde_json::to_string(&sku).unwrap();
        let back: Sku = serde_json::from_str(&json).unwrap();
        assert_eq!(sku, back);

        let bad: Result<Sku, _> = serde_json::from_str("\"!\"");
        assert!(bad.is_err());
    }
}
