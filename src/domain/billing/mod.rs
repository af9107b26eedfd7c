//! Billing domain: subscriptions, payments, and Stripe webhook events.
//!
//! Everything here is pure. Network and database access live behind the
//! ports in `crate::ports`.

mod errors;
mod money;
mod payment;
mod stripe_event;
mod subscription;
mod webhook_errors;
mod webhook_verifier;

pub use errors::BillingError;
pub use money::{Money, DEFAULT_CURRENCY};
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use stripe_event::{
    BillingEvent, BillingEventKind, CheckoutCompleted, StripeEvent, StripeEventData,
    SubscriptionDeleted, CHECKOUT_SESSION_COMPLETED, CUSTOMER_SUBSCRIPTION_DELETED,
};
pub use subscription::{
    Subscription, SubscriptionActivation, SubscriptionStatus, ANNUAL_PLAN_NAME, PLAN_TERM_YEARS,
};
pub use webhook_errors::{WebhookError, WebhookFailureKind};
pub use webhook_verifier::{SignatureHeader, StripeWebhookVerifier, DEFAULT_TOLERANCE_SECS};
