//! Axum router configuration for billing endpoints.

use axum::{middleware, routing::post, Router};

use crate::adapters::http::middleware::{capture_raw_body, RawBodyLimit};

use super::handlers::{create_checkout, handle_stripe_webhook, BillingAppState};

/// Create the billing router, mounted at `/subscription`.
///
/// # Routes
/// - `POST /checkout` - Open a hosted checkout session
/// - `POST /stripe-webhook` - Receive Stripe events (signature verified)
///
/// Raw body capture is a `route_layer` on the webhook route only.
pub fn billing_routes(webhook_body_limit: usize) -> Router<BillingAppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route(
            "/stripe-webhook",
            post(handle_stripe_webhook).route_layer(middleware::from_fn_with_state(
                RawBodyLimit(webhook_body_limit),
                capture_raw_body,
            )),
        )
}
