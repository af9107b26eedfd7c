//! Payment ledger records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{PaymentId, SubscriptionId, ValidationError};

use super::money::Money;

/// Settlement status of a recorded payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Succeeded => "SUCCEEDED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "SUCCEEDED" => Ok(PaymentStatus::Succeeded),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// A payment row as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub subscription_id: SubscriptionId,
    pub amount: Money,
    pub status: PaymentStatus,
    /// External transaction identifier; unique across the ledger.
    pub transaction_id: String,
    pub payment_method: Option<String>,
}

/// A payment about to be written; the ledger assigns the ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub amount: Money,
    pub status: PaymentStatus,
    pub transaction_id: String,
    pub payment_method: Option<String>,
}

impl NewPayment {
    /// The payment recorded when a hosted checkout completes.
    ///
    /// The checkout session id doubles as the transaction id, which is what
    /// keeps redelivered events from recording the charge twice.
    pub fn from_completed_checkout(
        session_id: impl Into<String>,
        amount: Money,
        payment_method: Option<String>,
    ) -> Self {
        Self {
            amount,
            status: PaymentStatus::Succeeded,
            transaction_id: session_id.into(),
            payment_method,
        }
    }

    /// Materializes the row once ids are known.
    pub fn into_payment(self, id: PaymentId, subscription_id: SubscriptionId) -> Payment {
        Payment {
            id,
            subscription_id,
            amount: self.amount,
            status: self.status,
            transaction_id: self.transaction_id,
            payment_method: self.payment_method,
        }
    }
}
