//! Webhook error types for Stripe webhook handling.
//!
//! Every variant is a failure that happens before reconciliation touches the
//! ledger. Each one is classified as either an input problem or a security
//! problem, which decides how loudly it is logged.

use thiserror::Error;

/// How a webhook failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookFailureKind {
    /// Caller or payload problem. Logged at warn.
    Input,
    /// Authenticity problem. Logged at error, never explained to the caller.
    Security,
}

/// Errors that occur while authenticating and interpreting a webhook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// Raw body or signature header was not available.
    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    /// Signature header could not be parsed.
    #[error("Malformed signature header: {0}")]
    MalformedSignatureHeader(String),

    /// No signature in the header matches the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp is older than the tolerance or too far in the future.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Test-mode event received while live events are required.
    #[error("Livemode mismatch")]
    LivemodeMismatch,

    /// Verified payload is not a valid event.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from a recognized event.
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

impl WebhookError {
    pub fn kind(&self) -> WebhookFailureKind {
        match self {
            WebhookError::MalformedSignatureHeader(_)
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::LivemodeMismatch => WebhookFailureKind::Security,
            WebhookError::MissingInput(_)
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => WebhookFailureKind::Input,
        }
    }

    pub fn is_security_failure(&self) -> bool {
        self.kind() == WebhookFailureKind::Security
    }
}
