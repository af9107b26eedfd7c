//! PostgreSQL implementation of SubscriptionLedger.
//!
//! Activation is one upsert keyed on `user_id` plus, on the insert branch
//! only, a payment insert guarded by the unique `transaction_id`. Both run in
//! one transaction. Cancellation is a single conditional UPDATE.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::billing::{
    Money, Payment, PaymentStatus, Subscription, SubscriptionActivation, SubscriptionStatus,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{ActivationOutcome, CancellationOutcome, SubscriptionLedger};

/// PostgreSQL implementation of the SubscriptionLedger port.
pub struct PostgresSubscriptionLedger {
    pool: PgPool,
}

impl PostgresSubscriptionLedger {
    /// Creates a new PostgresSubscriptionLedger with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: i64,
    user_id: i64,
    status: String,
    stripe_subscription_id: String,
    plan_name: String,
    plan_price: Decimal,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

/// Upsert result: the row plus which branch ran.
#[derive(Debug, sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    subscription: SubscriptionRow,
    inserted: bool,
}

/// Cancel result: the row plus whether the status moved.
#[derive(Debug, sqlx::FromRow)]
struct CancelRow {
    #[sqlx(flatten)]
    subscription: SubscriptionRow,
    changed: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    subscription_id: i64,
    amount: Decimal,
    currency: String,
    status: String,
    transaction_id: String,
    payment_method: Option<String>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_raw(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            status: row.status.parse::<SubscriptionStatus>().map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid status: {}", e))
            })?,
            stripe_subscription_id: row.stripe_subscription_id,
            plan_name: row.plan_name,
            plan_price: row.plan_price,
            start_date: Timestamp::from_datetime(row.start_date),
            end_date: Timestamp::from_datetime(row.end_date),
        })
    }
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::from_raw(row.id),
            subscription_id: SubscriptionId::from_raw(row.subscription_id),
            amount: Money::from_major_units(row.amount, row.currency),
            status: row.status.parse::<PaymentStatus>().map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid status: {}", e))
            })?,
            transaction_id: row.transaction_id,
            payment_method: row.payment_method,
        })
    }
}

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, status, stripe_subscription_id, plan_name, plan_price, start_date, end_date";

fn map_write_error(context: &'static str, e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.constraint() == Some("subscriptions_stripe_subscription_id_key") {
            return DomainError::new(
                ErrorCode::DuplicateRecord,
                "Stripe subscription id already belongs to another user",
            );
        }
    }
    DomainError::database(context, e)
}

#[async_trait]
impl SubscriptionLedger for PostgresSubscriptionLedger {
    async fn activate(
        &self,
        activation: &SubscriptionActivation,
    ) -> Result<ActivationOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        // The WHERE clause is `Subscription::accepts`: a CANCELED row for the
        // same external subscription stays untouched and no row is returned.
        let upserted: Option<UpsertRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO subscriptions (
                user_id, status, stripe_subscription_id, plan_name, plan_price, start_date, end_date
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                status = EXCLUDED.status,
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                plan_name = EXCLUDED.plan_name,
                plan_price = EXCLUDED.plan_price,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                updated_at = now()
            WHERE NOT (
                subscriptions.status = 'CANCELED'
                AND subscriptions.stripe_subscription_id = EXCLUDED.stripe_subscription_id
            )
            RETURNING {}, (xmax = 0) AS inserted
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(activation.user_id.value())
        .bind(SubscriptionStatus::Active.as_str())
        .bind(&activation.stripe_subscription_id)
        .bind(&activation.plan_name)
        .bind(activation.plan_price.amount())
        .bind(activation.start_date.as_datetime())
        .bind(activation.end_date.as_datetime())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_write_error("Failed to upsert subscription", e))?;

        let outcome = match upserted {
            None => {
                let row: SubscriptionRow = sqlx::query_as(&format!(
                    "SELECT {} FROM subscriptions WHERE user_id = $1",
                    SUBSCRIPTION_COLUMNS
                ))
                .bind(activation.user_id.value())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| DomainError::database("Failed to load subscription", e))?;

                ActivationOutcome::Stale {
                    subscription: Subscription::try_from(row)?,
                }
            }
            Some(UpsertRow {
                subscription,
                inserted: false,
            }) => ActivationOutcome::Refreshed {
                subscription: Subscription::try_from(subscription)?,
            },
            Some(UpsertRow {
                subscription,
                inserted: true,
            }) => {
                let subscription = Subscription::try_from(subscription)?;
                let payment = &activation.initial_payment;

                let result = sqlx::query(
                    r#"
                    INSERT INTO payments (
                        subscription_id, amount, currency, status, transaction_id, payment_method
                    ) VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT (transaction_id) DO NOTHING
                    "#,
                )
                .bind(subscription.id.value())
                .bind(payment.amount.amount())
                .bind(payment.amount.currency())
                .bind(payment.status.as_str())
                .bind(&payment.transaction_id)
                .bind(&payment.payment_method)
                .execute(&mut *tx)
                .await
                .map_err(|e| DomainError::database("Failed to record payment", e))?;

                ActivationOutcome::Created {
                    subscription,
                    payment_recorded: result.rows_affected() == 1,
                }
            }
        };

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit activation", e))?;

        Ok(outcome)
    }

    async fn cancel_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<CancellationOutcome>, DomainError> {
        let row: Option<CancelRow> = sqlx::query_as(
            r#"
            WITH previous AS (
                SELECT id, status
                FROM subscriptions
                WHERE stripe_subscription_id = $1
                FOR UPDATE
            )
            UPDATE subscriptions AS s
            SET status = 'CANCELED',
                updated_at = CASE WHEN previous.status = 'CANCELED' THEN s.updated_at ELSE now() END
            FROM previous
            WHERE s.id = previous.id
            RETURNING s.id, s.user_id, s.status, s.stripe_subscription_id, s.plan_name,
                      s.plan_price, s.start_date, s.end_date,
                      (previous.status <> 'CANCELED') AS changed
            "#,
        )
        .bind(stripe_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to cancel subscription", e))?;

        row.map(|r| {
            Ok(CancellationOutcome {
                subscription: Subscription::try_from(r.subscription)?,
                changed: r.changed,
            })
        })
        .transpose()
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn payments_for_subscription(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, subscription_id, amount, currency, status, transaction_id, payment_method
            FROM payments
            WHERE subscription_id = $1
            ORDER BY id
            "#,
        )
        .bind(subscription_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list payments", e))?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}
