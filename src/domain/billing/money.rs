//! Monetary amounts.
//!
//! The payment processor reports amounts in minor units (cents); the ledger
//! stores major units with two decimal places.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency recorded for every checkout payment.
pub const DEFAULT_CURRENCY: &str = "usd";

/// Decimal places of the supported currencies.
const MINOR_UNIT_SCALE: u32 = 2;

/// An exact amount in major units plus its ISO currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    /// Converts a processor amount in minor units (e.g. 4999) to major units (49.99).
    pub fn from_minor_units(minor_units: i64, currency: impl Into<String>) -> Self {
        Self {
            amount: Decimal::new(minor_units, MINOR_UNIT_SCALE),
            currency: currency.into().to_lowercase(),
        }
    }

    /// Wraps an amount already expressed in major units.
    pub fn from_major_units(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into().to_lowercase(),
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}
