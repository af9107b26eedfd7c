//! User repository port (billing view).
//!
//! Users are owned by the identity side of the application. Billing only
//! reads them and records the external customer id once.
//!
//! # Design
//!
//! - **Set-once**: the external customer id is written only while it is NULL
//! - **Unique**: one external customer id maps to at most one user

use crate::domain::foundation::{DomainError, UserId};
use async_trait::async_trait;
use serde::Serialize;

/// The columns of a user row that billing needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingUser {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    /// External billing-customer identifier, unset until the first checkout.
    pub stripe_customer_id: Option<String>,
}

/// Repository port for reading users and linking them to the processor.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by internal ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: UserId) -> Result<Option<BillingUser>, DomainError>;

    /// Find the user linked to an external customer ID.
    async fn find_by_stripe_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<BillingUser>, DomainError>;

    /// Store the external customer ID if the user has none yet.
    ///
    /// Returns the ID that is stored after the call. When another request
    /// linked a customer first, that earlier ID is returned and `customer_id`
    /// is discarded.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the user doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn assign_stripe_customer_id(
        &self,
        id: UserId,
        customer_id: &str,
    ) -> Result<String, DomainError>;
}
