//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::billing::{
    CheckoutRedirects, CreateCheckoutSessionCommand, CreateCheckoutSessionHandler,
    CreateCheckoutSessionResult, HandleStripeWebhookCommand, HandleStripeWebhookHandler,
    HandleStripeWebhookResult, ReconcileBillingEventHandler, ReconciliationOutcome,
    ResolveBillingCustomerCommand, ResolveBillingCustomerHandler, ResolveBillingCustomerResult,
};
