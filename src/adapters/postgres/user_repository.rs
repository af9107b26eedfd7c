//! PostgreSQL implementation of UserRepository.

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{BillingUser, UserRepository};
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL implementation of the UserRepository port.
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a new PostgresUserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a user.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    name: Option<String>,
    stripe_customer_id: Option<String>,
}

impl TryFrom<UserRow> for BillingUser {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(BillingUser {
            id: UserId::new(row.id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user id: {}", e))
            })?,
            email: row.email,
            name: row.name,
            stripe_customer_id: row.stripe_customer_id,
        })
    }
}

fn map_link_error(e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.constraint() == Some("users_stripe_customer_id_key") {
            return DomainError::new(
                ErrorCode::DuplicateRecord,
                "Stripe customer id already linked to another user",
            );
        }
    }
    DomainError::database("Failed to link Stripe customer", e)
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<BillingUser>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, name, stripe_customer_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find user", e))?;

        row.map(BillingUser::try_from).transpose()
    }

    async fn find_by_stripe_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<BillingUser>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, name, stripe_customer_id
            FROM users
            WHERE stripe_customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find user by customer", e))?;

        row.map(BillingUser::try_from).transpose()
    }

    async fn assign_stripe_customer_id(
        &self,
        id: UserId,
        customer_id: &str,
    ) -> Result<String, DomainError> {
        let assigned: Option<(String,)> = sqlx::query_as(
            r#"
            UPDATE users
            SET stripe_customer_id = $2
            WHERE id = $1 AND stripe_customer_id IS NULL
            RETURNING stripe_customer_id
            "#,
        )
        .bind(id.value())
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_link_error)?;

        if let Some((stored,)) = assigned {
            return Ok(stored);
        }

        // Either the user is unknown or another request linked a customer first.
        let existing: Option<(Option<String>,)> =
            sqlx::query_as("SELECT stripe_customer_id FROM users WHERE id = $1")
                .bind(id.value())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to find user", e))?;

        match existing {
            None => Err(DomainError::new(
                ErrorCode::UserNotFound,
                format!("User not found: {}", id),
            )),
            Some((Some(stored),)) => Ok(stored),
            Some((None,)) => Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Stripe customer id was not stored",
            )),
        }
    }
}
