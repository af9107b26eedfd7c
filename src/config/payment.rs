//! Payment configuration

use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,

    /// Frontend base URL used for checkout redirects
    pub frontend_url: String,

    /// Stripe API base URL (override for stripe-mock)
    #[serde(default = "default_api_base_url")]
    pub stripe_api_base_url: String,

    /// Maximum accepted webhook age in seconds
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,

    /// Maximum webhook body size in bytes
    #[serde(default = "default_webhook_body_limit")]
    pub webhook_body_limit_bytes: usize,

    /// Reject test-mode webhook events
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    /// API key wrapped for handing to the Stripe client
    pub fn api_key(&self) -> SecretString {
        SecretString::new(self.stripe_api_key.clone())
    }

    /// Webhook secret wrapped for handing to the verifier
    pub fn webhook_secret(&self) -> SecretString {
        SecretString::new(self.stripe_webhook_secret.clone())
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }
        if self.frontend_url.is_empty() {
            return Err(ValidationError::MissingRequired("FRONTEND_URL"));
        }

        // Verify key prefixes for safety
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if !is_http_url(&self.frontend_url) {
            return Err(ValidationError::InvalidFrontendUrl);
        }
        if !is_http_url(&self.stripe_api_base_url) {
            return Err(ValidationError::InvalidStripeApiUrl);
        }
        if self.webhook_tolerance_secs <= 0 {
            return Err(ValidationError::InvalidWebhookTolerance);
        }
        if self.webhook_body_limit_bytes == 0 {
            return Err(ValidationError::InvalidWebhookBodyLimit);
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            frontend_url: String::new(),
            stripe_api_base_url: default_api_base_url(),
            webhook_tolerance_secs: default_webhook_tolerance(),
            webhook_body_limit_bytes: default_webhook_body_limit(),
            require_livemode: false,
        }
    }
}

impl fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("stripe_api_key", &"[REDACTED]")
            .field("stripe_webhook_secret", &"[REDACTED]")
            .field("frontend_url", &self.frontend_url)
            .field("stripe_api_base_url", &self.stripe_api_base_url)
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .field("webhook_body_limit_bytes", &self.webhook_body_limit_bytes)
            .field("require_livemode", &self.require_livemode)
            .finish()
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_webhook_tolerance() -> i64 {
    300
}

fn default_webhook_body_limit() -> usize {
    1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: "sk_test_abcd1234".to_string(),
            stripe_webhook_secret: "whsec_xyz789".to_string(),
            frontend_url: "https://jobs.example.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = PaymentConfig::default();
        assert_eq!(config.stripe_api_base_url, "https://api.stripe.com");
        assert_eq!(config.webhook_tolerance_secs, 300);
        assert_eq!(config.webhook_body_limit_bytes, 1_048_576);
        assert!(!config.require_livemode);
    }

    #[test]
    fn test_is_test_mode() {
        let config = valid();
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());
    }

    #[test]
    fn test_is_live_mode() {
        let config = PaymentConfig {
            stripe_api_key: "sk_live_xxx".to_string(),
            ..valid()
        };
        assert!(config.is_live_mode());
        assert!(!config.is_test_mode());
    }

    #[test]
    fn test_validation_missing_api_key() {
        let config = PaymentConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("STRIPE_API_KEY"))
        ));
    }

    #[test]
    fn test_validation_missing_frontend_url() {
        let config = PaymentConfig {
            frontend_url: String::new(),
            ..valid()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("FRONTEND_URL"))
        ));
    }

    #[test]
    fn test_validation_invalid_api_key_prefix() {
        let config = PaymentConfig {
            stripe_api_key: "pk_test_xxx".to_string(), // Publishable key
            ..valid()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidStripeKey)));
    }

    #[test]
    fn test_validation_invalid_webhook_secret_prefix() {
        let config = PaymentConfig {
            stripe_webhook_secret: "secret_xxx".to_string(),
            ..valid()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        ));
    }

    #[test]
    fn test_validation_frontend_url_scheme() {
        let config = PaymentConfig {
            frontend_url: "jobs.example.com".to_string(),
            ..valid()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidFrontendUrl)));
    }

    #[test]
    fn test_validation_zero_tolerance() {
        let config = PaymentConfig {
            webhook_tolerance_secs: 0,
            ..valid()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidWebhookTolerance)));
    }

    #[test]
    fn test_validation_zero_body_limit() {
        let config = PaymentConfig {
            webhook_body_limit_bytes: 0,
            ..valid()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidWebhookBodyLimit)));
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", valid());
        assert!(!debug.contains("sk_test_abcd1234"));
        assert!(!debug.contains("whsec_xyz789"));
    }
}
