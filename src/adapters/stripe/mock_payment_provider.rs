//! Mock payment provider for testing.
//!
//! Provides a configurable mock implementation of `PaymentProvider` for unit
//! and integration tests. Supports:
//! - Pre-configured responses
//! - Error injection
//! - Call tracking
//! - Idempotency-key replay, like the real API

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    PaymentProvider,
};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
///
/// // Inject errors
/// mock.set_method_error("create_checkout_session", PaymentError::network("down"));
///
/// // Use in tests, then assert on calls
/// assert_eq!(mock.call_count("create_customer"), 1);
/// ```
#[derive(Default)]
pub struct MockPaymentProvider {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Customers created so far, by ID.
    customers: HashMap<String, Customer>,

    /// Customer ID previously returned for an idempotency key.
    idempotent_customers: HashMap<String, String>,

    /// Counter used to mint IDs.
    sequence: u64,

    /// Error to return on next call.
    next_error: Option<PaymentError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, PaymentError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    /// Create a new mock provider with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Number of distinct customers the mock has created.
    pub fn customer_count(&self) -> usize {
        self.state().customers.len()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.state();

        // Check method-specific error first
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        // Check global error (consumes it)
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

impl Clone for MockPaymentProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        self.record_call(
            "create_customer",
            vec![request.user_id.to_string(), request.email.clone()],
        );
        self.check_error("create_customer")?;

        let mut state = self.state();

        if let Some(key) = &request.idempotency_key {
            if let Some(existing) = state
                .idempotent_customers
                .get(key)
                .and_then(|id| state.customers.get(id))
            {
                return Ok(existing.clone());
            }
        }

        state.sequence += 1;
        let customer = Customer {
            id: format!("cus_mock_{}", state.sequence),
            email: Some(request.email),
            name: request.name,
        };

        state.customers.insert(customer.id.clone(), customer.clone());
        if let Some(key) = request.idempotency_key {
            state.idempotent_customers.insert(key, customer.id.clone());
        }

        Ok(customer)
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.record_call(
            "create_checkout_session",
            vec![request.customer_id.clone(), request.price_id.clone()],
        );
        self.check_error("create_checkout_session")?;

        let mut state = self.state();
        state.sequence += 1;
        let id = format!("cs_mock_{}", state.sequence);
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.stripe.com/c/pay/{}", id)),
            id,
            customer_id: Some(request.customer_id),
            mode: "subscription".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::ports::PaymentErrorCode;

    fn test_user_id() -> UserId {
        UserId::new(1).unwrap()
    }

    fn checkout_request(customer_id: &str) -> CreateCheckoutRequest {
        CreateCheckoutRequest {
            user_id: test_user_id(),
            customer_id: customer_id.to_string(),
            price_id: "price_123".to_string(),
            success_url: "https://app.example.com/success".to_string(),
            cancel_url: "https://app.example.com/cancel".to_string(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Basic Operation Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn create_customer_returns_mock_customer() {
        let mock = MockPaymentProvider::new();

        let customer = mock
            .create_customer(CreateCustomerRequest {
                user_id: test_user_id(),
                email: "test@example.com".to_string(),
                name: Some("Test".to_string()),
                idempotency_key: None,
            })
            .await
            .unwrap();

        assert!(customer.id.starts_with("cus_mock_"));
        assert_eq!(customer.email.as_deref(), Some("test@example.com"));
    }

    #[tokio::test]
    async fn same_idempotency_key_returns_same_customer() {
        let mock = MockPaymentProvider::new();
        let request =
            CreateCustomerRequest::for_user(test_user_id(), "test@example.com", None);

        let first = mock.create_customer(request.clone()).await.unwrap();
        let second = mock.create_customer(request).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(mock.customer_count(), 1);
        assert_eq!(mock.call_count("create_customer"), 2);
    }

    #[tokio::test]
    async fn checkout_session_echoes_customer() {
        let mock = MockPaymentProvider::new();

        let session = mock
            .create_checkout_session(checkout_request("cus_1"))
            .await
            .unwrap();

        assert!(session.id.starts_with("cs_mock_"));
        assert_eq!(session.customer_id.as_deref(), Some("cus_1"));
        assert_eq!(session.mode, "subscription");
        assert!(session.url.is_some());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Injection Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn global_error_is_consumed_once() {
        let mock = MockPaymentProvider::new();
        mock.set_error(PaymentError::network("Connection failed"));

        let first = mock.create_checkout_session(checkout_request("cus_1")).await;
        let second = mock.create_checkout_session(checkout_request("cus_1")).await;

        assert_eq!(first.unwrap_err().code, PaymentErrorCode::NetworkError);
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn method_error_persists_until_cleared() {
        let mock = MockPaymentProvider::new();
        mock.set_method_error("create_checkout_session", PaymentError::invalid_request("bad price"));

        assert!(mock.create_checkout_session(checkout_request("cus_1")).await.is_err());
        assert!(mock.create_checkout_session(checkout_request("cus_1")).await.is_err());

        mock.clear_errors();
        assert!(mock.create_checkout_session(checkout_request("cus_1")).await.is_ok());
    }

    #[tokio::test]
    async fn calls_are_recorded_with_args() {
        let mock = MockPaymentProvider::new();

        mock.create_checkout_session(checkout_request("cus_9")).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "create_checkout_session");
        assert_eq!(calls[0].args, vec!["cus_9".to_string(), "price_123".to_string()]);
        assert!(mock.was_called("create_checkout_session"));
        assert!(!mock.was_called("create_customer"));
    }
}
