//! Stripe webhook event types.
//!
//! `StripeEvent` mirrors the signed JSON envelope. `BillingEvent` is the
//! closed set of event kinds this service acts on, with a catch-all arm for
//! kinds the processor may add later.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::webhook_errors::WebhookError;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const CUSTOMER_SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// Stripe webhook event envelope.
///
/// Additional fields from Stripe's full event schema are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    /// Object containing event-specific data.
    pub data: StripeEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,

    /// API version used to render this event.
    #[serde(default)]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,
}

/// A reference Stripe renders either as a bare id or as an expanded object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    fn into_id(self) -> String {
        match self {
            Expandable::Id(id) | Expandable::Object { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    id: String,
    customer: Option<Expandable>,
    subscription: Option<Expandable>,
    amount_total: Option<i64>,
    #[serde(default)]
    payment_method_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    customer: Option<Expandable>,
}

/// A verified event reduced to what reconciliation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingEvent {
    pub id: String,
    /// When the processor created the event.
    pub created: Timestamp,
    pub livemode: bool,
    pub kind: BillingEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEventKind {
    CheckoutCompleted(CheckoutCompleted),
    SubscriptionDeleted(SubscriptionDeleted),
    /// Any kind this service does not act on.
    Other(String),
}

impl BillingEventKind {
    pub fn event_type(&self) -> &str {
        match self {
            BillingEventKind::CheckoutCompleted(_) => CHECKOUT_SESSION_COMPLETED,
            BillingEventKind::SubscriptionDeleted(_) => CUSTOMER_SUBSCRIPTION_DELETED,
            BillingEventKind::Other(event_type) => event_type,
        }
    }
}

/// A hosted checkout finished and the customer was charged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCompleted {
    pub session_id: String,
    pub customer_id: String,
    pub subscription_id: String,
    /// Total charged, in minor currency units.
    pub amount_total: i64,
    pub payment_method: Option<String>,
}

/// The processor ended a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDeleted {
    pub subscription_id: String,
    pub customer_id: Option<String>,
}

impl TryFrom<StripeEvent> for BillingEvent {
    type Error = WebhookError;

    fn try_from(event: StripeEvent) -> Result<Self, Self::Error> {
        let created = Timestamp::from_unix_secs(event.created)
            .ok_or_else(|| WebhookError::ParseError("event timestamp out of range".to_string()))?;

        let kind = match event.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => {
                BillingEventKind::CheckoutCompleted(parse_checkout(event.data.object)?)
            }
            CUSTOMER_SUBSCRIPTION_DELETED => {
                BillingEventKind::SubscriptionDeleted(parse_subscription_deleted(event.data.object)?)
            }
            _ => BillingEventKind::Other(event.event_type),
        };

        Ok(BillingEvent {
            id: event.id,
            created,
            livemode: event.livemode,
            kind,
        })
    }
}

fn parse_checkout(object: serde_json::Value) -> Result<CheckoutCompleted, WebhookError> {
    let session: CheckoutSessionObject = serde_json::from_value(object)
        .map_err(|e| WebhookError::ParseError(format!("invalid checkout session: {}", e)))?;

    let customer_id = session
        .customer
        .map(Expandable::into_id)
        .ok_or(WebhookError::MissingField("customer"))?;
    let subscription_id = session
        .subscription
        .map(Expandable::into_id)
        .ok_or(WebhookError::MissingField("subscription"))?;
    let amount_total = session
        .amount_total
        .ok_or(WebhookError::MissingField("amount_total"))?;
    if amount_total < 0 {
        return Err(WebhookError::ParseError("negative amount_total".to_string()));
    }

    Ok(CheckoutCompleted {
        session_id: session.id,
        customer_id,
        subscription_id,
        amount_total,
        payment_method: session.payment_method_types.into_iter().next(),
    })
}

fn parse_subscription_deleted(
    object: serde_json::Value,
) -> Result<SubscriptionDeleted, WebhookError> {
    let subscription: SubscriptionObject = serde_json::from_value(object)
        .map_err(|e| WebhookError::ParseError(format!("invalid subscription: {}", e)))?;

    Ok(SubscriptionDeleted {
        subscription_id: subscription.id,
        customer_id: subscription.customer.map(Expandable::into_id),
    })
}
