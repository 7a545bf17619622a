//! Status and kind enums shared across the engine.

use serde::{Deserialize, Serialize};

/// How the customer pays for an order.
///
/// Maps to the remote store's `paymentType` field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Bank transfer; requires an uploaded payment proof.
    Transfer,
    /// Debit card (simulated locally).
    Debit,
    /// Credit card (simulated locally).
    Credit,
}

impl PaymentType {
    /// Whether this payment type requires a proof-of-payment attachment.
    #[must_use]
    pub const fn requires_proof(self) -> bool {
        matches!(self, Self::Transfer)
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transfer => write!(f, "transfer"),
            Self::Debit => write!(f, "debit"),
            Self::Credit => write!(f, "credit"),
        }
    }
}

impl std::str::FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer" => Ok(Self::Transfer),
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("invalid payment type: {s}")),
        }
    }
}

/// Kind of cart line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Standard catalog product.
    #[default]
    Product,
    /// Customized arrangement (carries a customization note).
    Custom,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_payment_type_roundtrip() {
        for (s, expected) in [
            ("transfer", PaymentType::Transfer),
            ("debit", PaymentType::Debit),
            ("credit", PaymentType::Credit),
        ] {
            assert_eq!(PaymentType::from_str(s), Ok(expected));
            assert_eq!(expected.to_string(), s);
        }
        assert!(PaymentType::from_str("cash").is_err());
    }

    #[test]
    fn test_only_transfer_requires_proof() {
        assert!(PaymentType::Transfer.requires_proof());
        assert!(!PaymentType::Debit.requires_proof());
        assert!(!PaymentType::Credit.requires_proof());
    }
}
