//! ReconcileBillingEventHandler - Applies a verified Stripe event to the ledger.
//!
//! Every write is a single atomic conditional statement in the ledger, so
//! redelivered and concurrent copies of one event converge on the same rows.
//! References to customers or subscriptions this service does not know are
//! acknowledged, not failed; failing them would make Stripe retry forever.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, BillingEvent, BillingEventKind, CheckoutCompleted, SubscriptionActivation,
    SubscriptionDeleted,
};
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::ports::{ActivationOutcome, SubscriptionLedger, UserRepository};

/// What reconciliation did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// A subscription row was created for the user.
    Activated {
        user_id: UserId,
        subscription_id: SubscriptionId,
        payment_recorded: bool,
    },
    /// The user's row was rewritten (redelivery or a new Stripe subscription).
    Refreshed {
        user_id: UserId,
        subscription_id: SubscriptionId,
    },
    /// The row is CANCELED for this Stripe subscription and was left alone.
    Stale {
        user_id: UserId,
        subscription_id: SubscriptionId,
    },
    /// The row is CANCELED. `changed` is false for a redelivery.
    Canceled {
        subscription_id: SubscriptionId,
        changed: bool,
    },
    /// The checkout references a customer no user is linked to.
    UnknownCustomer { customer_id: String },
    /// The deletion references a subscription not in the ledger.
    UnknownSubscription { stripe_subscription_id: String },
    /// The event kind is not acted on.
    Ignored { event_type: String },
}

/// Handler that interprets verified events.
pub struct ReconcileBillingEventHandler {
    users: Arc<dyn UserRepository>,
    ledger: Arc<dyn SubscriptionLedger>,
}

impl ReconcileBillingEventHandler {
    pub fn new(users: Arc<dyn UserRepository>, ledger: Arc<dyn SubscriptionLedger>) -> Self {
        Self { users, ledger }
    }

    pub async fn handle(&self, event: &BillingEvent) -> Result<ReconciliationOutcome, BillingError> {
        let outcome = match &event.kind {
            BillingEventKind::CheckoutCompleted(checkout) => {
                self.handle_checkout_completed(checkout, event.created).await?
            }
            BillingEventKind::SubscriptionDeleted(deleted) => {
                self.handle_subscription_deleted(deleted).await?
            }
            BillingEventKind::Other(event_type) => ReconciliationOutcome::Ignored {
                event_type: event_type.clone(),
            },
        };

        log_outcome(event, &outcome);
        Ok(outcome)
    }

    async fn handle_checkout_completed(
        &self,
        checkout: &CheckoutCompleted,
        occurred_at: Timestamp,
    ) -> Result<ReconciliationOutcome, BillingError> {
        let Some(user) = self
            .users
            .find_by_stripe_customer_id(&checkout.customer_id)
            .await?
        else {
            return Ok(ReconciliationOutcome::UnknownCustomer {
                customer_id: checkout.customer_id.clone(),
            });
        };

        let activation = SubscriptionActivation::from_checkout(user.id, checkout, occurred_at);

        let outcome = match self.ledger.activate(&activation).await? {
            ActivationOutcome::Created {
                subscription,
                payment_recorded,
            } => ReconciliationOutcome::Activated {
                user_id: user.id,
                subscription_id: subscription.id,
                payment_recorded,
            },
            ActivationOutcome::Refreshed { subscription } => ReconciliationOutcome::Refreshed {
                user_id: user.id,
                subscription_id: subscription.id,
            },
            ActivationOutcome::Stale { subscription } => ReconciliationOutcome::Stale {
                user_id: user.id,
                subscription_id: subscription.id,
            },
        };

        Ok(outcome)
    }

    async fn handle_subscription_deleted(
        &self,
        deleted: &SubscriptionDeleted,
    ) -> Result<ReconciliationOutcome, BillingError> {
        let outcome = match self
            .ledger
            .cancel_by_stripe_subscription_id(&deleted.subscription_id)
            .await?
        {
            Some(cancellation) => ReconciliationOutcome::Canceled {
                subscription_id: cancellation.subscription.id,
                changed: cancellation.changed,
            },
            None => ReconciliationOutcome::UnknownSubscription {
                stripe_subscription_id: deleted.subscription_id.clone(),
            },
        };

        Ok(outcome)
    }
}

fn log_outcome(event: &BillingEvent, outcome: &ReconciliationOutcome) {
    let event_id = event.id.as_str();
    let event_type = event.kind.event_type();

    match outcome {
        ReconciliationOutcome::Activated {
            user_id,
            subscription_id,
            payment_recorded,
        } => tracing::info!(
            event_id,
            event_type,
            user_id = %user_id,
            subscription_id = %subscription_id,
            payment_recorded,
            "Subscription activated"
        ),
        ReconciliationOutcome::Refreshed {
            user_id,
            subscription_id,
        } => tracing::info!(
            event_id,
            event_type,
            user_id = %user_id,
            subscription_id = %subscription_id,
            "Subscription refreshed"
        ),
        ReconciliationOutcome::Stale {
            user_id,
            subscription_id,
        } => tracing::info!(
            event_id,
            event_type,
            user_id = %user_id,
            subscription_id = %subscription_id,
            "Checkout for canceled subscription ignored"
        ),
        ReconciliationOutcome::Canceled {
            subscription_id,
            changed,
        } => tracing::info!(
            event_id,
            event_type,
            subscription_id = %subscription_id,
            changed,
            "Subscription canceled"
        ),
        ReconciliationOutcome::UnknownCustomer { customer_id } => tracing::warn!(
            event_id,
            event_type,
            customer_id = %customer_id,
            "No user linked to Stripe customer"
        ),
        ReconciliationOutcome::UnknownSubscription {
            stripe_subscription_id,
        } => tracing::warn!(
            event_id,
            event_type,
            stripe_subscription_id = %stripe_subscription_id,
            "No subscription found for deletion"
        ),
        ReconciliationOutcome::Ignored { .. } => {
            tracing::info!(event_id, event_type, "Unhandled event type")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemorySubscriptionLedger, InMemoryUserRepository};
    use crate::domain::billing::{PaymentStatus, SubscriptionStatus};
    use crate::domain::foundation::{DomainError, ErrorCode};
    use crate::ports::{BillingUser, CancellationOutcome};
    use crate::domain::billing::{Payment, Subscription};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const CREATED: i64 = 1_704_067_200;

    // ════════════════════════════════════════════════════════════════════════════
    // Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        ledger: Arc<InMemorySubscriptionLedger>,
        handler: ReconcileBillingEventHandler,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(InMemoryUserRepository::new());
        users
            .insert(BillingUser {
                id: UserId::new(1).unwrap(),
                email: "u1@example.com".to_string(),
                name: None,
                stripe_customer_id: Some("cus_u1".to_string()),
            })
            .unwrap();
        let ledger = Arc::new(InMemorySubscriptionLedger::new());
        let handler = ReconcileBillingEventHandler::new(users, ledger.clone());
        Fixture { ledger, handler }
    }

    fn checkout_event(customer: &str, subscription: &str, session: &str) -> BillingEvent {
        BillingEvent {
            id: format!("evt_{}", session),
            created: Timestamp::from_unix_secs(CREATED).unwrap(),
            livemode: false,
            kind: BillingEventKind::CheckoutCompleted(CheckoutCompleted {
                session_id: session.to_string(),
                customer_id: customer.to_string(),
                subscription_id: subscription.to_string(),
                amount_total: 4999,
                payment_method: Some("card".to_string()),
            }),
        }
    }

    fn deleted_event(subscription: &str) -> BillingEvent {
        BillingEvent {
            id: format!("evt_del_{}", subscription),
            created: Timestamp::from_unix_secs(CREATED + 60).unwrap(),
            livemode: false,
            kind: BillingEventKind::SubscriptionDeleted(SubscriptionDeleted {
                subscription_id: subscription.to_string(),
                customer_id: Some("cus_u1".to_string()),
            }),
        }
    }

    fn user1() -> UserId {
        UserId::new(1).unwrap()
    }

    async fn subscription_of(f: &Fixture) -> Subscription {
        f.ledger.find_by_user(user1()).await.unwrap().unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout Completed
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn checkout_completed_activates_subscription_and_records_payment() {
        let f = fixture();

        let outcome = f
            .handler
            .handle(&checkout_event("cus_u1", "sub_abc", "cs_1"))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ReconciliationOutcome::Activated { payment_recorded: true, .. }
        ));
        let subscription = subscription_of(&f).await;
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(subscription.stripe_subscription_id, "sub_abc");
        assert_eq!(subscription.plan_name, "Annual Plan");
        assert_eq!(subscription.start_date.as_unix_secs(), CREATED);

        let payments = f.ledger.payments_for_subscription(subscription.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].transaction_id, "cs_1");
        assert_eq!(payments[0].status, PaymentStatus::Succeeded);
        assert_eq!(payments[0].amount.currency(), "usd");
    }

    #[tokio::test]
    async fn price_is_converted_from_minor_units() {
        let f = fixture();

        f.handler
            .handle(&checkout_event("cus_u1", "sub_abc", "cs_1"))
            .await
            .unwrap();

        assert_eq!(subscription_of(&f).await.plan_price, Decimal::from_str("49.99").unwrap());
    }

    #[tokio::test]
    async fn duplicate_delivery_is_idempotent() {
        let f = fixture();
        let event = checkout_event("cus_u1", "sub_abc", "cs_1");

        f.handler.handle(&event).await.unwrap();
        let first = subscription_of(&f).await;
        let second_outcome = f.handler.handle(&event).await.unwrap();
        let second = subscription_of(&f).await;

        assert!(matches!(second_outcome, ReconciliationOutcome::Refreshed { .. }));
        assert_eq!(first, second);
        assert_eq!(f.ledger.subscription_count(), 1);
        assert_eq!(f.ledger.payment_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicate_deliveries_record_one_payment() {
        let f = fixture();
        let event = checkout_event("cus_u1", "sub_abc", "cs_1");

        let (a, b) = tokio::join!(f.handler.handle(&event), f.handler.handle(&event));

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(f.ledger.subscription_count(), 1);
        assert_eq!(f.ledger.payment_count(), 1);
    }

    #[tokio::test]
    async fn unknown_customer_is_acknowledged_without_writes() {
        let f = fixture();

        let outcome = f
            .handler
            .handle(&checkout_event("cus_stranger", "sub_x", "cs_x"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconciliationOutcome::UnknownCustomer {
                customer_id: "cus_stranger".to_string()
            }
        );
        assert_eq!(f.ledger.subscription_count(), 0);
        assert_eq!(f.ledger.payment_count(), 0);
    }

    #[tokio::test]
    async fn late_checkout_redelivery_does_not_resurrect_canceled() {
        let f = fixture();
        let checkout = checkout_event("cus_u1", "sub_abc", "cs_1");
        f.handler.handle(&checkout).await.unwrap();
        f.handler.handle(&deleted_event("sub_abc")).await.unwrap();

        let outcome = f.handler.handle(&checkout).await.unwrap();

        assert!(matches!(outcome, ReconciliationOutcome::Stale { .. }));
        assert_eq!(subscription_of(&f).await.status, SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn resubscribe_with_new_subscription_refreshes_single_row() {
        let f = fixture();
        f.handler
            .handle(&checkout_event("cus_u1", "sub_abc", "cs_1"))
            .await
            .unwrap();
        f.handler.handle(&deleted_event("sub_abc")).await.unwrap();

        let outcome = f
            .handler
            .handle(&checkout_event("cus_u1", "sub_def", "cs_2"))
            .await
            .unwrap();

        assert!(matches!(outcome, ReconciliationOutcome::Refreshed { .. }));
        let subscription = subscription_of(&f).await;
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(subscription.stripe_subscription_id, "sub_def");
        assert_eq!(f.ledger.subscription_count(), 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscription Deleted
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn deletion_cancels_and_redelivery_is_stable() {
        let f = fixture();
        f.handler
            .handle(&checkout_event("cus_u1", "sub_1", "cs_1"))
            .await
            .unwrap();

        let first = f.handler.handle(&deleted_event("sub_1")).await.unwrap();
        let after_first = subscription_of(&f).await;
        let second = f.handler.handle(&deleted_event("sub_1")).await.unwrap();
        let after_second = subscription_of(&f).await;

        assert!(matches!(first, ReconciliationOutcome::Canceled { changed: true, .. }));
        assert!(matches!(second, ReconciliationOutcome::Canceled { changed: false, .. }));
        assert_eq!(after_first.status, SubscriptionStatus::Canceled);
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn deletion_of_unknown_subscription_is_acknowledged() {
        let f = fixture();

        let outcome = f.handler.handle(&deleted_event("sub_missing")).await.unwrap();

        assert_eq!(
            outcome,
            ReconciliationOutcome::UnknownSubscription {
                stripe_subscription_id: "sub_missing".to_string()
            }
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Other Kinds and Failures
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn other_event_kinds_are_ignored() {
        let f = fixture();
        let event = BillingEvent {
            id: "evt_other".to_string(),
            created: Timestamp::from_unix_secs(CREATED).unwrap(),
            livemode: false,
            kind: BillingEventKind::Other("invoice.paid".to_string()),
        };

        let outcome = f.handler.handle(&event).await.unwrap();

        assert_eq!(
            outcome,
            ReconciliationOutcome::Ignored {
                event_type: "invoice.paid".to_string()
            }
        );
    }

    struct FailingLedger;

    #[async_trait]
    impl SubscriptionLedger for FailingLedger {
        async fn activate(
            &self,
            _activation: &SubscriptionActivation,
        ) -> Result<ActivationOutcome, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "Simulated write failure"))
        }

        async fn cancel_by_stripe_subscription_id(
            &self,
            _stripe_subscription_id: &str,
        ) -> Result<Option<CancellationOutcome>, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "Simulated write failure"))
        }

        async fn find_by_user(&self, _user_id: UserId) -> Result<Option<Subscription>, DomainError> {
            Ok(None)
        }

        async fn payments_for_subscription(
            &self,
            _subscription_id: SubscriptionId,
        ) -> Result<Vec<Payment>, DomainError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn ledger_failure_propagates_for_recognized_event() {
        let users = Arc::new(InMemoryUserRepository::new());
        users
            .insert(BillingUser {
                id: user1(),
                email: "u1@example.com".to_string(),
                name: None,
                stripe_customer_id: Some("cus_u1".to_string()),
            })
            .unwrap();
        let handler = ReconcileBillingEventHandler::new(users, Arc::new(FailingLedger));

        let err = handler
            .handle(&checkout_event("cus_u1", "sub_1", "cs_1"))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Infrastructure(_)));
    }
}
