//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe integration:
//! - Customer creation (idempotent per user)
//! - Hosted checkout sessions in subscription mode
//!
//! Webhook verification is pure and lives in `domain::billing`.
//!
//! # Security
//!
//! - The secret key is held as `secrecy::SecretString` and redacted in `Debug`
//! - Upstream error bodies are logged, never returned to API callers

mod api_types;
mod mock_payment_provider;
mod stripe_adapter;

pub use api_types::{StripeApiError, StripeCheckoutSession, StripeCustomer, StripeErrorResponse};
pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter, DEFAULT_API_BASE_URL};
