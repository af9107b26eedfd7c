//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;

use crate::adapters::http::middleware::{RawBody, STRIPE_SIGNATURE_HEADER};
use crate::application::{
    CheckoutRedirects, CreateCheckoutSessionCommand, CreateCheckoutSessionHandler,
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, ReconcileBillingEventHandler,
    ResolveBillingCustomerHandler,
};
use crate::domain::billing::{BillingError, StripeWebhookVerifier};
use crate::domain::foundation::{ErrorCode, UserId};
use crate::ports::{PaymentProvider, SubscriptionLedger, UserRepository};

use super::dto::{CheckoutRequest, CheckoutResponse, ErrorResponse, HealthResponse, WebhookAckResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the billing routes.
///
/// Cloned per request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub user_repository: Arc<dyn UserRepository>,
    pub subscription_ledger: Arc<dyn SubscriptionLedger>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub webhook_verifier: Arc<StripeWebhookVerifier>,
    pub checkout_redirects: CheckoutRedirects,
    /// Cap on captured webhook bodies, in bytes.
    pub webhook_body_limit: usize,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn checkout_handler(&self) -> CreateCheckoutSessionHandler {
        CreateCheckoutSessionHandler::new(
            ResolveBillingCustomerHandler::new(
                self.user_repository.clone(),
                self.payment_provider.clone(),
            ),
            self.payment_provider.clone(),
            self.checkout_redirects.clone(),
        )
    }

    pub fn webhook_handler(&self) -> HandleStripeWebhookHandler {
        HandleStripeWebhookHandler::new(
            self.webhook_verifier.clone(),
            ReconcileBillingEventHandler::new(
                self.user_repository.clone(),
                self.subscription_ledger.clone(),
            ),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /subscription/checkout - Open a hosted checkout session
pub async fn create_checkout(
    State(state): State<BillingAppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BillingApiError> {
    let Json(request) = payload.map_err(|rejection| {
        BillingApiError::checkout(BillingError::validation("body", rejection.body_text()))
    })?;
    let user_id = UserId::new(request.user_id).map_err(BillingApiError::checkout)?;

    let handler = state.checkout_handler();
    let cmd = CreateCheckoutSessionCommand {
        user_id,
        plan_id: request.plan_id,
    };

    let result = handler.handle(cmd).await.map_err(BillingApiError::checkout)?;

    Ok(Json(CheckoutResponse::from(result)))
}

/// POST /subscription/stripe-webhook - Receive a Stripe event delivery
///
/// Reads the body captured by the raw body middleware, never a re-serialized
/// form of it.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    raw_body: Option<Extension<RawBody>>,
) -> Result<impl IntoResponse, BillingApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let payload = raw_body.as_ref().map(|Extension(raw)| &raw.0[..]);

    let handler = state.webhook_handler();
    let cmd = HandleStripeWebhookCommand { payload, signature };

    let result = handler.handle(cmd).await.map_err(BillingApiError::webhook)?;

    tracing::debug!(
        event_id = %result.event_id,
        event_type = %result.event_type,
        "Webhook acknowledged"
    );

    Ok(Json(WebhookAckResponse::received()))
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Checkout,
    Webhook,
}

/// API error wrapper for billing routes.
///
/// Every failure is a `400` with a generic `{code, message}` body. The
/// underlying error is logged, never returned.
#[derive(Debug)]
pub struct BillingApiError {
    endpoint: Endpoint,
    error: BillingError,
}

impl BillingApiError {
    pub fn checkout(error: impl Into<BillingError>) -> Self {
        Self {
            endpoint: Endpoint::Checkout,
            error: error.into(),
        }
    }

    pub fn webhook(error: impl Into<BillingError>) -> Self {
        Self {
            endpoint: Endpoint::Webhook,
            error: error.into(),
        }
    }

    pub fn error(&self) -> &BillingError {
        &self.error
    }

    fn public_parts(&self) -> (ErrorCode, &'static str) {
        match (self.endpoint, &self.error) {
            (Endpoint::Checkout, BillingError::ValidationFailed { .. }) => {
                (ErrorCode::ValidationFailed, "Invalid checkout request")
            }
            (Endpoint::Checkout, _) => {
                (ErrorCode::CheckoutFailed, "Could not create checkout session")
            }
            (Endpoint::Webhook, err) if err.is_security_failure() => (
                ErrorCode::InvalidWebhookSignature,
                "Webhook signature verification failed",
            ),
            (Endpoint::Webhook, BillingError::Webhook(_)) => {
                (ErrorCode::InvalidWebhookPayload, "Invalid webhook request")
            }
            (Endpoint::Webhook, _) => (ErrorCode::InternalError, "Webhook could not be processed"),
        }
    }

    fn log(&self, code: ErrorCode) {
        let detail = self.error.message();
        match &self.error {
            err if err.is_security_failure() => {
                tracing::error!(code = %code, error = %detail, "Webhook authentication failed");
            }
            BillingError::Infrastructure(_) | BillingError::Upstream { .. } => {
                tracing::error!(code = %code, error = %detail, "Billing request failed");
            }
            _ => {
                tracing::warn!(code = %code, error = %detail, "Billing request rejected");
            }
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let (code, message) = self.public_parts();
        self.log(code);
        let body = ErrorResponse::new(code.to_string(), message);
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
