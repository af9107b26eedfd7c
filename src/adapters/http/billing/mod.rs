//! HTTP adapter for billing endpoints.
//!
//! - `POST /subscription/checkout` - Open a hosted checkout session
//! - `POST /subscription/stripe-webhook` - Handle Stripe webhooks

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{BillingApiError, BillingAppState};
pub use routes::billing_routes;
