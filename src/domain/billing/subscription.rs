//! Subscription ledger record and its status state machine.
//!
//! A user owns at most one Subscription row. The row is written only by
//! webhook reconciliation. Within one Stripe subscription id the status
//! follows a closed machine with no way out of CANCELED:
//!
//! ```text
//! (none) ──checkout completed──▶ ACTIVE ──subscription deleted──▶ CANCELED
//!                                 ▲  │                                │
//!                                 └──┘ redelivery                     └─▶ CANCELED (redelivery)
//! ```
//!
//! A completed checkout carrying a different Stripe subscription id is a new
//! lifecycle. It replaces the row and starts again from `(none) → ACTIVE`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, SubscriptionId, Timestamp, UserId, ValidationError};

use super::money::{Money, DEFAULT_CURRENCY};
use super::payment::NewPayment;
use super::stripe_event::CheckoutCompleted;

/// Label stored on every subscription created through checkout.
pub const ANNUAL_PLAN_NAME: &str = "Annual Plan";

/// Length of a subscription term started by checkout.
pub const PLAN_TERM_YEARS: u32 = 1;

/// Lifecycle status of a local subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(SubscriptionStatus::Active),
            "CANCELED" => Ok(SubscriptionStatus::Canceled),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Active => vec![Active, Canceled],
            Canceled => vec![Canceled],
        }
    }
}

/// A subscription row as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub status: SubscriptionStatus,
    pub stripe_subscription_id: String,
    pub plan_name: String,
    pub plan_price: Decimal,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
}

impl Subscription {
    /// Whether `activation` continues this row's Stripe subscription.
    pub fn same_lifecycle(&self, activation: &SubscriptionActivation) -> bool {
        self.stripe_subscription_id == activation.stripe_subscription_id
    }

    /// Whether a completed checkout may overwrite this row.
    ///
    /// For the same Stripe subscription the status machine decides, so a
    /// CANCELED row refuses a late redelivery. A new lifecycle is always
    /// accepted.
    pub fn accepts(&self, activation: &SubscriptionActivation) -> bool {
        !self.same_lifecycle(activation)
            || self.status.can_transition_to(&SubscriptionStatus::Active)
    }

    /// Applies a completed checkout to this row, keeping its id.
    ///
    /// Fails when the status machine refuses ACTIVE for the same lifecycle.
    pub fn refresh(&mut self, activation: &SubscriptionActivation) -> Result<(), ValidationError> {
        if self.same_lifecycle(activation) {
            self.status.transition_to(SubscriptionStatus::Active)?;
        }
        *self = activation.to_subscription(self.id);
        Ok(())
    }

    /// Moves the subscription to CANCELED. Returns whether the status changed.
    pub fn cancel(&mut self) -> Result<bool, ValidationError> {
        let next = self.status.transition_to(SubscriptionStatus::Canceled)?;
        let changed = next != self.status;
        self.status = next;
        Ok(changed)
    }
}

/// Everything a completed checkout writes to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionActivation {
    pub user_id: UserId,
    pub stripe_subscription_id: String,
    pub plan_name: String,
    pub plan_price: Money,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    /// Recorded only when the activation creates the row.
    pub initial_payment: NewPayment,
}

impl SubscriptionActivation {
    /// Builds the activation for `user_id` from a completed checkout.
    ///
    /// `occurred_at` is the processor's event time, so every delivery of the
    /// same event produces the same values.
    pub fn from_checkout(
        user_id: UserId,
        checkout: &CheckoutCompleted,
        occurred_at: Timestamp,
    ) -> Self {
        let price = Money::from_minor_units(checkout.amount_total, DEFAULT_CURRENCY);

        Self {
            user_id,
            stripe_subscription_id: checkout.subscription_id.clone(),
            plan_name: ANNUAL_PLAN_NAME.to_string(),
            plan_price: price.clone(),
            start_date: occurred_at,
            end_date: occurred_at.add_years(PLAN_TERM_YEARS),
            initial_payment: NewPayment::from_completed_checkout(
                checkout.session_id.clone(),
                price,
                checkout.payment_method.clone(),
            ),
        }
    }

    /// The row this activation produces under the given id.
    pub fn to_subscription(&self, id: SubscriptionId) -> Subscription {
        Subscription {
            id,
            user_id: self.user_id,
            status: SubscriptionStatus::Active,
            stripe_subscription_id: self.stripe_subscription_id.clone(),
            plan_name: self.plan_name.clone(),
            plan_price: self.plan_price.amount(),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}
