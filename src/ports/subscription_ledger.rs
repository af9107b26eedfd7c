//! Subscription ledger port.
//!
//! Persists Subscription and Payment rows. Both writes that webhook
//! reconciliation performs are single atomic conditional statements, so two
//! concurrent deliveries of the same event cannot both take the creation
//! branch.

use crate::domain::billing::{Payment, Subscription, SubscriptionActivation};
use crate::domain::foundation::{DomainError, SubscriptionId, UserId};
use async_trait::async_trait;

/// What an activation did to the user's row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// No row existed; one was created. `payment_recorded` is false when a
    /// payment with the same transaction id already existed.
    Created {
        subscription: Subscription,
        payment_recorded: bool,
    },

    /// The user's row was overwritten with the activation values.
    Refreshed { subscription: Subscription },

    /// The user's row is CANCELED for the same external subscription and was
    /// left untouched.
    Stale { subscription: Subscription },
}

impl ActivationOutcome {
    pub fn subscription(&self) -> &Subscription {
        match self {
            ActivationOutcome::Created { subscription, .. }
            | ActivationOutcome::Refreshed { subscription }
            | ActivationOutcome::Stale { subscription } => subscription,
        }
    }
}

/// Result of cancelling by external subscription id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationOutcome {
    pub subscription: Subscription,
    /// False when the row was already CANCELED.
    pub changed: bool,
}

/// Ledger port for subscription and payment rows.
#[async_trait]
pub trait SubscriptionLedger: Send + Sync {
    /// Upsert the user's subscription and, on the creation branch only,
    /// insert the initial payment, in one transaction.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn activate(
        &self,
        activation: &SubscriptionActivation,
    ) -> Result<ActivationOutcome, DomainError>;

    /// Set CANCELED on the row with this external subscription id.
    ///
    /// Returns `None` when no row matches.
    async fn cancel_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<CancellationOutcome>, DomainError>;

    /// Find the user's subscription.
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Subscription>, DomainError>;

    /// List payments recorded against a subscription, oldest first.
    async fn payments_for_subscription(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Vec<Payment>, DomainError>;
}
