//! HandleStripeWebhookHandler - Command handler for Stripe webhook deliveries.
//!
//! Authentication runs to completion before the payload is interpreted; a
//! delivery that fails it never reaches the reconciler.

use std::sync::Arc;

use crate::domain::billing::{BillingError, StripeWebhookVerifier};

use super::reconcile_billing_event::{ReconcileBillingEventHandler, ReconciliationOutcome};

/// Command carrying one captured webhook delivery.
#[derive(Debug, Clone, Copy)]
pub struct HandleStripeWebhookCommand<'a> {
    /// Exact request body bytes, if they were captured.
    pub payload: Option<&'a [u8]>,
    /// Value of the `Stripe-Signature` header.
    pub signature: Option<&'a str>,
}

/// Result of processing a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleStripeWebhookResult {
    pub event_id: String,
    pub event_type: String,
    pub outcome: ReconciliationOutcome,
}

/// Handler for Stripe webhook deliveries.
pub struct HandleStripeWebhookHandler {
    verifier: Arc<StripeWebhookVerifier>,
    reconciler: ReconcileBillingEventHandler,
}

impl HandleStripeWebhookHandler {
    pub fn new(verifier: Arc<StripeWebhookVerifier>, reconciler: ReconcileBillingEventHandler) -> Self {
        Self {
            verifier,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleStripeWebhookCommand<'_>,
    ) -> Result<HandleStripeWebhookResult, BillingError> {
        // 1. Verify signature, then parse the event
        let event = self.verifier.authenticate(cmd.payload, cmd.signature)?;

        // 2. Apply it
        let outcome = self.reconciler.handle(&event).await?;

        Ok(HandleStripeWebhookResult {
            event_id: event.id,
            event_type: event.kind.event_type().to_string(),
            outcome,
        })
    }
}
