//! In-memory user repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{BillingUser, UserRepository};

/// User store backed by a `HashMap`, for tests and local runs.
///
/// The customer id assignment follows the same set-once rule as the
/// PostgreSQL adapter.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, BillingUser>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user row.
    pub fn insert(&self, user: BillingUser) -> Result<(), DomainError> {
        self.write()?.insert(user.id, user);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<UserId, BillingUser>>, DomainError> {
        self.users
            .read()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "user store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<UserId, BillingUser>>, DomainError> {
        self.users
            .write()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "user store lock poisoned"))
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<BillingUser>, DomainError> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn find_by_stripe_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<BillingUser>, DomainError> {
        Ok(self
            .read()?
            .values()
            .find(|u| u.stripe_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn assign_stripe_customer_id(
        &self,
        id: UserId,
        customer_id: &str,
    ) -> Result<String, DomainError> {
        let mut users = self.write()?;

        let taken = users
            .values()
            .any(|u| u.id != id && u.stripe_customer_id.as_deref() == Some(customer_id));
        if taken {
            return Err(DomainError::new(
                ErrorCode::DuplicateRecord,
                "Stripe customer id already linked to another user",
            ));
        }

        let user = users.get_mut(&id).ok_or_else(|| {
            DomainError::new(ErrorCode::UserNotFound, format!("User not found: {}", id))
        })?;

        match &user.stripe_customer_id {
            Some(existing) => Ok(existing.clone()),
            None => {
                user.stripe_customer_id = Some(customer_id.to_string());
                Ok(customer_id.to_string())
            }
        }
    }
}
