//! Billing-specific error types.
//!
//! # HTTP Status Mapping
//!
//! Both billing routes answer every failure with 400; the code below only
//! decides the `code` field of the body and the log level.
//!
//! | Error | Code |
//! |-------|------|
//! | UserNotFound | USER_NOT_FOUND |
//! | ValidationFailed | VALIDATION_FAILED |
//! | Upstream | EXTERNAL_SERVICE_ERROR |
//! | Webhook (security) | INVALID_WEBHOOK_SIGNATURE |
//! | Webhook (input) | INVALID_WEBHOOK_PAYLOAD |
//! | Infrastructure | DATABASE_ERROR |

use crate::domain::foundation::{DomainError, ErrorCode, UserId, ValidationError};

use super::webhook_errors::WebhookError;

/// Errors raised by the billing use cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// The internal user id does not resolve to a user.
    UserNotFound(UserId),

    /// Request input was rejected.
    ValidationFailed { field: String, message: String },

    /// The payment processor call failed. Not retried here.
    Upstream { reason: String },

    /// The webhook delivery could not be authenticated or interpreted.
    Webhook(WebhookError),

    /// Persistence failed.
    Infrastructure(String),
}

impl BillingError {
    pub fn user_not_found(user_id: UserId) -> Self {
        BillingError::UserNotFound(user_id)
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn upstream(reason: impl Into<String>) -> Self {
        BillingError::Upstream {
            reason: reason.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::UserNotFound(_) => ErrorCode::UserNotFound,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Upstream { .. } => ErrorCode::ExternalServiceError,
            BillingError::Webhook(err) if err.is_security_failure() => {
                ErrorCode::InvalidWebhookSignature
            }
            BillingError::Webhook(_) => ErrorCode::InvalidWebhookPayload,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a message suitable for logs. Not sent to callers verbatim.
    pub fn message(&self) -> String {
        match self {
            BillingError::UserNotFound(user_id) => format!("User not found: {}", user_id),
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::Upstream { reason } => format!("Payment processor error: {}", reason),
            BillingError::Webhook(err) => format!("Webhook rejected: {}", err),
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Security failures are logged at error level.
    pub fn is_security_failure(&self) -> bool {
        matches!(self, BillingError::Webhook(err) if err.is_security_failure())
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<WebhookError> for BillingError {
    fn from(err: WebhookError) -> Self {
        BillingError::Webhook(err)
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        let field = match &err {
            ValidationError::EmptyField { field }
            | ValidationError::NotPositive { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field.clone(),
        };
        BillingError::ValidationFailed {
            field,
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => BillingError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::ExternalServiceError => BillingError::Upstream {
                reason: err.message,
            },
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<BillingError> for DomainError {
    fn from(err: BillingError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
