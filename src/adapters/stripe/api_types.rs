//! Stripe REST API response types.
//!
//! Only the fields the adapter reads are declared; serde ignores the rest.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stripe Customer object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCustomer {
    /// Unique customer identifier (cus_...).
    pub id: String,

    /// Customer email address.
    pub email: Option<String>,

    /// Customer name.
    pub name: Option<String>,

    /// Custom metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Stripe Checkout Session object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    /// Unique session identifier (cs_...).
    pub id: String,

    /// Hosted payment page. Absent once the session is complete or expired.
    pub url: Option<String>,

    /// Customer ID the session is scoped to.
    pub customer: Option<String>,

    /// Payment mode (payment, setup, subscription).
    pub mode: String,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    /// Error category (api_error, card_error, invalid_request_error, ...).
    #[serde(rename = "type")]
    pub error_type: Option<String>,

    /// Short machine code such as `resource_missing`.
    pub code: Option<String>,

    pub message: Option<String>,
}
