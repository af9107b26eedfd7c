//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the billing API.
//! They serve as the boundary between HTTP and the application layer.

use serde::{Deserialize, Serialize};

use crate::application::CreateCheckoutSessionResult;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to open a checkout session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Internal user id. Must be a positive integer.
    pub user_id: i64,
    /// Stripe price id of the plan.
    pub plan_id: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Session descriptor returned to the frontend.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    /// Stripe checkout session id.
    pub id: String,
    /// Hosted checkout URL to redirect to.
    pub url: Option<String>,
    /// Stripe customer id the session is scoped to.
    pub customer: String,
    /// Session mode.
    pub mode: String,
}

impl From<CreateCheckoutSessionResult> for CheckoutResponse {
    fn from(result: CreateCheckoutSessionResult) -> Self {
        Self {
            id: result.session.id,
            url: result.session.url,
            customer: result.customer_id,
            mode: result.session.mode,
        }
    }
}

/// Acknowledgement for a processed webhook delivery.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}

impl WebhookAckResponse {
    pub fn received() -> Self {
        Self { received: true }
    }
}

/// Liveness probe response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Generic human-readable message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
