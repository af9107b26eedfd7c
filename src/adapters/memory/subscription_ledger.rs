//! In-memory subscription ledger.
//!
//! Every operation runs under one mutex, which gives the same atomicity the
//! PostgreSQL adapter gets from its conditional statements.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use crate::domain::billing::{Payment, Subscription, SubscriptionActivation};
use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, SubscriptionId, UserId};
use crate::ports::{ActivationOutcome, CancellationOutcome, SubscriptionLedger};

#[derive(Default)]
struct LedgerState {
    subscriptions: Vec<Subscription>,
    payments: Vec<Payment>,
    next_subscription_id: i64,
    next_payment_id: i64,
}

impl LedgerState {
    fn external_id_taken_by_other_user(&self, activation: &SubscriptionActivation) -> bool {
        self.subscriptions.iter().any(|s| {
            s.user_id != activation.user_id
                && s.stripe_subscription_id == activation.stripe_subscription_id
        })
    }
}

/// Subscription and payment rows kept in memory.
#[derive(Default)]
pub struct InMemorySubscriptionLedger {
    state: Mutex<LedgerState>,
}

impl InMemorySubscriptionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscription rows.
    pub fn subscription_count(&self) -> usize {
        self.state.lock().map(|s| s.subscriptions.len()).unwrap_or(0)
    }

    /// Number of payment rows.
    pub fn payment_count(&self) -> usize {
        self.state.lock().map(|s| s.payments.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "ledger lock poisoned"))
    }
}

#[async_trait]
impl SubscriptionLedger for InMemorySubscriptionLedger {
    async fn activate(
        &self,
        activation: &SubscriptionActivation,
    ) -> Result<ActivationOutcome, DomainError> {
        let mut state = self.lock()?;

        if state.external_id_taken_by_other_user(activation) {
            return Err(DomainError::new(
                ErrorCode::DuplicateRecord,
                "Stripe subscription id already belongs to another user",
            ));
        }

        let position = state
            .subscriptions
            .iter()
            .position(|s| s.user_id == activation.user_id);

        if let Some(index) = position {
            let existing = &mut state.subscriptions[index];
            if !existing.accepts(activation) {
                return Ok(ActivationOutcome::Stale {
                    subscription: existing.clone(),
                });
            }

            existing.refresh(activation)?;
            return Ok(ActivationOutcome::Refreshed {
                subscription: existing.clone(),
            });
        }

        state.next_subscription_id += 1;
        let subscription =
            activation.to_subscription(SubscriptionId::from_raw(state.next_subscription_id));
        state.subscriptions.push(subscription.clone());

        let payment = &activation.initial_payment;
        let duplicate = state
            .payments
            .iter()
            .any(|p| p.transaction_id == payment.transaction_id);
        if !duplicate {
            state.next_payment_id += 1;
            let id = PaymentId::from_raw(state.next_payment_id);
            state
                .payments
                .push(payment.clone().into_payment(id, subscription.id));
        }

        Ok(ActivationOutcome::Created {
            subscription,
            payment_recorded: !duplicate,
        })
    }

    async fn cancel_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<CancellationOutcome>, DomainError> {
        let mut state = self.lock()?;

        let Some(subscription) = state
            .subscriptions
            .iter_mut()
            .find(|s| s.stripe_subscription_id == stripe_subscription_id)
        else {
            return Ok(None);
        };

        let changed = subscription.cancel()?;

        Ok(Some(CancellationOutcome {
            subscription: subscription.clone(),
            changed,
        }))
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .lock()?
            .subscriptions
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn payments_for_subscription(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Vec<Payment>, DomainError> {
        Ok(self
            .lock()?
            .payments
            .iter()
            .filter(|p| p.subscription_id == subscription_id)
            .cloned()
            .collect())
    }
}
