//! CreateCheckoutSessionHandler - Command handler for opening a hosted checkout.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::UserId;
use crate::ports::{CheckoutSession, CreateCheckoutRequest, PaymentProvider};

use super::resolve_billing_customer::{ResolveBillingCustomerCommand, ResolveBillingCustomerHandler};

/// Fixed redirect targets for hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRedirects {
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutRedirects {
    /// Builds `<base>/success?session_id={CHECKOUT_SESSION_ID}` and `<base>/cancel`.
    ///
    /// `{CHECKOUT_SESSION_ID}` is a Stripe template placeholder and is sent
    /// literally.
    pub fn from_frontend_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            success_url: format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", base),
            cancel_url: format!("{}/cancel", base),
        }
    }
}

/// Command to open a checkout session.
#[derive(Debug, Clone)]
pub struct CreateCheckoutSessionCommand {
    pub user_id: UserId,
    /// Stripe price id of the plan.
    pub plan_id: String,
}

/// Result of successful checkout initiation.
#[derive(Debug, Clone)]
pub struct CreateCheckoutSessionResult {
    pub session: CheckoutSession,
    pub customer_id: String,
}

/// Handler for opening hosted checkout sessions.
///
/// Nothing is written locally. A customer created along the way stays
/// linked even when the session call fails.
pub struct CreateCheckoutSessionHandler {
    customers: ResolveBillingCustomerHandler,
    payment_provider: Arc<dyn PaymentProvider>,
    redirects: CheckoutRedirects,
}

impl CreateCheckoutSessionHandler {
    pub fn new(
        customers: ResolveBillingCustomerHandler,
        payment_provider: Arc<dyn PaymentProvider>,
        redirects: CheckoutRedirects,
    ) -> Self {
        Self {
            customers,
            payment_provider,
            redirects,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutSessionCommand,
    ) -> Result<CreateCheckoutSessionResult, BillingError> {
        // 1. Validate plan
        let plan_id = cmd.plan_id.trim();
        if plan_id.is_empty() {
            return Err(BillingError::validation("planId", "Plan id is required"));
        }

        // 2. Resolve the Stripe customer (may create one)
        let customer = self
            .customers
            .handle(ResolveBillingCustomerCommand {
                user_id: cmd.user_id,
            })
            .await?;

        // 3. Open the session
        let session = self
            .payment_provider
            .create_checkout_session(CreateCheckoutRequest {
                user_id: cmd.user_id,
                customer_id: customer.customer_id.clone(),
                price_id: plan_id.to_string(),
                success_url: self.redirects.success_url.clone(),
                cancel_url: self.redirects.cancel_url.clone(),
            })
            .await?;

        tracing::info!(
            user_id = %cmd.user_id,
            customer_id = %customer.customer_id,
            session_id = %session.id,
            "Checkout session created"
        );

        Ok(CreateCheckoutSessionResult {
            session,
            customer_id: customer.customer_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryUserRepository;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::ports::{BillingUser, PaymentError, UserRepository};

    fn seeded_users(customer: Option<&str>) -> Arc<InMemoryUserRepository> {
        let users = Arc::new(InMemoryUserRepository::new());
        users
            .insert(BillingUser {
                id: UserId::new(1).unwrap(),
                email: "u1@example.com".to_string(),
                name: Some("U One".to_string()),
                stripe_customer_id: customer.map(str::to_string),
            })
            .unwrap();
        users
    }

    fn handler(
        users: Arc<InMemoryUserRepository>,
        provider: MockPaymentProvider,
    ) -> CreateCheckoutSessionHandler {
        let provider: Arc<dyn PaymentProvider> = Arc::new(provider);
        CreateCheckoutSessionHandler::new(
            ResolveBillingCustomerHandler::new(users, provider.clone()),
            provider,
            CheckoutRedirects::from_frontend_url("https://jobs.example.com/"),
        )
    }

    fn cmd(plan_id: &str) -> CreateCheckoutSessionCommand {
        CreateCheckoutSessionCommand {
            user_id: UserId::new(1).unwrap(),
            plan_id: plan_id.to_string(),
        }
    }

    #[test]
    fn redirects_are_built_from_frontend_url() {
        let redirects = CheckoutRedirects::from_frontend_url("https://jobs.example.com/");

        assert_eq!(
            redirects.success_url,
            "https://jobs.example.com/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(redirects.cancel_url, "https://jobs.example.com/cancel");
    }

    #[tokio::test]
    async fn first_checkout_creates_customer_then_session() {
        let users = seeded_users(None);
        let provider = MockPaymentProvider::new();

        let result = handler(users, provider.clone())
            .handle(cmd("price_123"))
            .await
            .unwrap();

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, "create_customer");
        assert_eq!(calls[1].method, "create_checkout_session");
        assert_eq!(calls[1].args, vec![result.customer_id.clone(), "price_123".to_string()]);
        assert_eq!(result.session.customer_id, Some(result.customer_id));
        assert_eq!(result.session.mode, "subscription");
    }

    #[tokio::test]
    async fn linked_user_skips_customer_creation() {
        let provider = MockPaymentProvider::new();

        let result = handler(seeded_users(Some("cus_1")), provider.clone())
            .handle(cmd("price_123"))
            .await
            .unwrap();

        assert_eq!(result.customer_id, "cus_1");
        assert_eq!(provider.call_count("create_customer"), 0);
    }

    #[tokio::test]
    async fn blank_plan_is_rejected_before_any_call() {
        let provider = MockPaymentProvider::new();

        let err = handler(seeded_users(None), provider.clone())
            .handle(cmd("   "))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::ValidationFailed { .. }));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn session_failure_keeps_created_customer() {
        let users = seeded_users(None);
        let provider = MockPaymentProvider::new();
        provider.set_method_error("create_checkout_session", PaymentError::network("timeout"));

        let err = handler(users.clone(), provider)
            .handle(cmd("price_123"))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Upstream { .. }));
        let user = users.find_by_id(UserId::new(1).unwrap()).await.unwrap().unwrap();
        assert!(user.stripe_customer_id.is_some());
    }

    #[tokio::test]
    async fn unknown_user_fails_with_not_found() {
        let users = Arc::new(InMemoryUserRepository::new());

        let err = handler(users, MockPaymentProvider::new())
            .handle(cmd("price_123"))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::UserNotFound(_)));
    }
}
