//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentProvider` - Stripe customer and checkout session calls
//! - `UserRepository` - User lookup and external customer linking
//! - `SubscriptionLedger` - Subscription and payment rows

mod payment_provider;
mod subscription_ledger;
mod user_repository;

pub use payment_provider::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    PaymentErrorCode, PaymentProvider,
};
pub use subscription_ledger::{ActivationOutcome, CancellationOutcome, SubscriptionLedger};
pub use user_repository::{BillingUser, UserRepository};
