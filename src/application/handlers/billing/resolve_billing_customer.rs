//! ResolveBillingCustomerHandler - Maps an internal user to a Stripe customer.
//!
//! Returns the stored customer id without any network call when one exists.
//! Otherwise creates the customer at Stripe and links it to the user. The
//! create call carries an idempotency key derived from the user id, and the
//! link only writes while the column is still NULL, so concurrent first
//! checkouts converge on one customer id.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::{ErrorCode, UserId};
use crate::ports::{CreateCustomerRequest, PaymentProvider, UserRepository};

/// Command to resolve a user's billing customer.
#[derive(Debug, Clone)]
pub struct ResolveBillingCustomerCommand {
    pub user_id: UserId,
}

/// Result of resolving a billing customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveBillingCustomerResult {
    pub customer_id: String,
    /// Whether this call created the customer at Stripe.
    pub created: bool,
}

/// Handler for the user to Stripe customer mapping.
pub struct ResolveBillingCustomerHandler {
    users: Arc<dyn UserRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl ResolveBillingCustomerHandler {
    pub fn new(users: Arc<dyn UserRepository>, payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            users,
            payment_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: ResolveBillingCustomerCommand,
    ) -> Result<ResolveBillingCustomerResult, BillingError> {
        // 1. Load the user
        let user = self
            .users
            .find_by_id(cmd.user_id)
            .await?
            .ok_or(BillingError::UserNotFound(cmd.user_id))?;

        // 2. Already linked: no network call
        if let Some(customer_id) = user.stripe_customer_id {
            return Ok(ResolveBillingCustomerResult {
                customer_id,
                created: false,
            });
        }

        // 3. Create the customer at Stripe (errors propagate, no retry)
        let customer = self
            .payment_provider
            .create_customer(CreateCustomerRequest::for_user(
                user.id,
                user.email,
                user.name,
            ))
            .await?;

        // 4. Link it; an earlier link wins
        let stored = self
            .users
            .assign_stripe_customer_id(user.id, &customer.id)
            .await
            .map_err(|e| match e.code {
                ErrorCode::UserNotFound => BillingError::UserNotFound(user.id),
                _ => BillingError::from(e),
            })?;

        let created = stored == customer.id;
        if created {
            tracing::info!(user_id = %user.id, customer_id = %stored, "Linked new Stripe customer");
        } else {
            tracing::warn!(
                user_id = %user.id,
                customer_id = %stored,
                discarded_customer_id = %customer.id,
                "User was linked to a Stripe customer concurrently"
            );
        }

        Ok(ResolveBillingCustomerResult {
            customer_id: stored,
            created,
        })
    }
}
