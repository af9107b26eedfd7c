//! Billing handlers.
//!
//! ## Commands
//! - Resolving (creating on first use) a user's Stripe customer
//! - Opening hosted checkout sessions
//! - Authenticating and reconciling Stripe webhook deliveries

mod create_checkout_session;
mod handle_stripe_webhook;
mod reconcile_billing_event;
mod resolve_billing_customer;

pub use create_checkout_session::{
    CheckoutRedirects, CreateCheckoutSessionCommand, CreateCheckoutSessionHandler,
    CreateCheckoutSessionResult,
};
pub use handle_stripe_webhook::{
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, HandleStripeWebhookResult,
};
pub use reconcile_billing_event::{ReconcileBillingEventHandler, ReconciliationOutcome};
pub use resolve_billing_customer::{
    ResolveBillingCustomerCommand, ResolveBillingCustomerHandler, ResolveBillingCustomerResult,
};
