//! Raw request body capture for signed webhook routes.
//!
//! Stripe signs the literal bytes it sends. This middleware buffers the body
//! before any extractor sees it and stores a copy in the request extensions,
//! so the handler verifies exactly what arrived on the wire.
//!
//! ```text
//! Request (stripe-signature present) → capture_raw_body → RawBody in extensions
//!                                                              ↓
//!                                         Handler reads Option<Extension<RawBody>>
//! ```
//!
//! Requests without the signature header pass through untouched. Apply it with
//! `route_layer` on the webhook route only; other routes keep normal JSON
//! extraction.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header::CONTENT_LENGTH, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use http_body_util::LengthLimitError;
use std::error::Error as _;

use crate::adapters::http::billing::dto::ErrorResponse;

/// Header whose presence triggers capture.
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Exact bytes of a captured request body.
#[derive(Debug, Clone)]
pub struct RawBody(pub Bytes);

/// Upper bound on buffered body size, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct RawBodyLimit(pub usize);

/// Buffers the request body when a Stripe signature header is present.
///
/// Bodies larger than the limit are rejected with `413 Payload Too Large`;
/// a body that fails mid-read is a `400`.
pub async fn capture_raw_body(
    State(RawBodyLimit(limit)): State<RawBodyLimit>,
    request: Request,
    next: Next,
) -> Response {
    if !request.headers().contains_key(STRIPE_SIGNATURE_HEADER) {
        return next.run(request).await;
    }

    // Reject early when the declared length already exceeds the cap
    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return payload_too_large(limit);
    }

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) if exceeded_limit(&e) => return payload_too_large(limit),
        Err(e) => {
            tracing::warn!(error = %e, "Webhook body could not be read");
            return unreadable_body();
        }
    };

    let mut request = Request::from_parts(parts, Body::from(bytes.clone()));
    request.extensions_mut().insert(RawBody(bytes));
    next.run(request).await
}

/// Whether `to_bytes` stopped because the body passed the limit.
fn exceeded_limit(err: &axum::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if cause.is::<LengthLimitError>() {
            return true;
        }
        source = cause.source();
    }
    false
}

fn unreadable_body() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(
            "INVALID_WEBHOOK_PAYLOAD",
            "Request body could not be read",
        )),
    )
        .into_response()
}

fn payload_too_large(limit: usize) -> Response {
    tracing::warn!(limit, "Webhook body exceeds capture limit");
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(ErrorResponse::new(
            "PAYLOAD_TOO_LARGE",
            "Request body is too large",
        )),
    )
        .into_response()
}
