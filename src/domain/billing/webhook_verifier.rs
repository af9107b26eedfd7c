//! Stripe webhook signature verification.
//!
//! Verifies Stripe webhook signatures using HMAC-SHA256 over the exact bytes
//! that were received, with a timestamp window against replays. The payload
//! is not looked at until the signature has been accepted.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::stripe_event::{BillingEvent, StripeEvent};
use super::webhook_errors::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age for webhook events (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components from the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// All v1 signatures (HMAC-SHA256). Several are sent while a secret rotates.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a Stripe-Signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<signature>[,v1=<signature>...][,v0=<legacy>]`
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part.trim().split_once('=').ok_or_else(|| {
                WebhookError::MalformedSignatureHeader("invalid header format".to_string())
            })?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::MalformedSignatureHeader("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    let signature = hex::decode(value).map_err(|_| {
                        WebhookError::MalformedSignatureHeader("invalid v1 signature hex".to_string())
                    })?;
                    v1_signatures.push(signature);
                }
                _ => {
                    // v0 and unknown schemes are ignored
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            WebhookError::MalformedSignatureHeader("missing timestamp".to_string())
        })?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::MalformedSignatureHeader(
                "missing v1 signature".to_string(),
            ));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifier for Stripe webhook signatures.
///
/// Built once from configuration and shared; holds no mutable state.
pub struct StripeWebhookVerifier {
    /// The webhook signing secret from Stripe dashboard.
    secret: SecretString,
    /// Maximum accepted event age in seconds.
    tolerance_secs: i64,
    /// Reject test-mode events.
    require_livemode: bool,
}

impl StripeWebhookVerifier {
    /// Creates a new verifier with the given webhook secret and default tolerance.
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            require_livemode: false,
        }
    }

    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }

    /// Authenticates a captured webhook delivery and returns the typed event.
    ///
    /// Fails with `MissingInput` when the raw body or the signature header is
    /// absent, which means the capture middleware did not run for this request.
    pub fn authenticate(
        &self,
        payload: Option<&[u8]>,
        signature_header: Option<&str>,
    ) -> Result<BillingEvent, WebhookError> {
        let payload = payload.ok_or(WebhookError::MissingInput("raw body"))?;
        let signature_header =
            signature_header.ok_or(WebhookError::MissingInput("stripe-signature header"))?;

        self.verify_and_parse(payload, signature_header)
    }

    /// Verifies the webhook signature against the current time and parses the event.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<BillingEvent, WebhookError> {
        self.verify_and_parse_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Same as [`verify_and_parse`](Self::verify_and_parse) with an explicit clock.
    ///
    /// # Verification Steps
    ///
    /// 1. Parse the signature header
    /// 2. Compare every v1 signature against the expected one (constant-time)
    /// 3. Validate timestamp is within the tolerance window
    /// 4. Parse the JSON payload and map it to a `BillingEvent`
    /// 5. Enforce livemode if required
    pub fn verify_and_parse_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<BillingEvent, WebhookError> {
        self.verify_signature_at(payload, signature_header, now)?;

        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        if self.require_livemode && !event.livemode {
            return Err(WebhookError::LivemodeMismatch);
        }

        BillingEvent::try_from(event)
    }

    /// Checks authenticity only; the payload is treated as opaque bytes.
    pub fn verify_signature_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<(), WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;
        let expected = self.compute_signature(header.timestamp, payload)?;

        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if !matched {
            return Err(WebhookError::InvalidSignature);
        }

        self.validate_timestamp(header.timestamp, now)
    }

    /// Produces a valid `Stripe-Signature` header value for a payload.
    ///
    /// Used for fixtures and for replaying captured events locally.
    pub fn generate_test_header(
        &self,
        timestamp: i64,
        payload: &[u8],
    ) -> Result<String, WebhookError> {
        let signature = self.compute_signature(timestamp, payload)?;
        Ok(format!("t={},v1={}", timestamp, hex::encode(signature)))
    }

    fn validate_timestamp(&self, timestamp: i64, now: i64) -> Result<(), WebhookError> {
        let age = now.saturating_sub(timestamp);

        if age > self.tolerance_secs || age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::TimestampOutOfRange);
        }

        Ok(())
    }

    /// HMAC-SHA256 of `"{timestamp}."` followed by the untouched payload bytes.
    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TEST_SECRET: &str = "whsec_test_secret_12345";
    const NOW: i64 = 1_704_067_200;

    fn verifier(secret: &str) -> StripeWebhookVerifier {
        StripeWebhookVerifier::new(SecretString::new(secret.to_string()))
    }

    fn checkout_payload() -> &'static str {
        r#"{"id":"evt_test123","type":"checkout.session.completed","created":1704067200,"data":{"object":{"id":"cs_1","customer":"cus_1","subscription":"sub_1","amount_total":4999}},"livemode":false}"#
    }

    // ══════════════════════════════════════════════════════════════
    // SignatureHeader Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_header_with_v1_only() {
        let header_str = format!("t=1234567890,v1={}", "a".repeat(64));

        let header = SignatureHeader::parse(&header_str).unwrap();

        assert_eq!(header.timestamp, 1234567890);
        assert_eq!(header.v1_signatures.len(), 1);
        assert_eq!(header.v1_signatures[0].len(), 32);
    }

    #[test]
    fn parse_header_collects_multiple_v1() {
        let header_str = format!("t=1,v1={},v1={},v0={}", "a".repeat(64), "b".repeat(64), "c".repeat(64));

        let header = SignatureHeader::parse(&header_str).unwrap();

        assert_eq!(header.v1_signatures.len(), 2);
    }

    #[test]
    fn parse_header_ignores_unknown_fields() {
        let header_str = format!("t=1234567890,v1={},v2=future,scheme=hmac", "a".repeat(64));
        assert!(SignatureHeader::parse(&header_str).is_ok());
    }

    #[test]
    fn parse_header_missing_timestamp_fails() {
        let result = SignatureHeader::parse(&format!("v1={}", "a".repeat(64)));
        assert!(matches!(result, Err(WebhookError::MalformedSignatureHeader(_))));
    }

    #[test]
    fn parse_header_missing_v1_fails() {
        let result = SignatureHeader::parse("t=1234567890");
        assert!(matches!(result, Err(WebhookError::MalformedSignatureHeader(_))));
    }

    #[test]
    fn parse_header_invalid_hex_fails() {
        let result = SignatureHeader::parse("t=1234567890,v1=not_valid_hex");
        assert!(matches!(result, Err(WebhookError::MalformedSignatureHeader(_))));
    }

    #[test]
    fn parse_header_no_equals_fails() {
        let result = SignatureHeader::parse("t1234567890");
        assert!(matches!(result, Err(WebhookError::MalformedSignatureHeader(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_valid_signature() {
        let verifier = verifier(TEST_SECRET);
        let payload = checkout_payload().as_bytes();
        let header = verifier.generate_test_header(NOW, payload).unwrap();

        let event = verifier.verify_and_parse_at(payload, &header, NOW).unwrap();

        assert_eq!(event.id, "evt_test123");
    }

    #[test]
    fn verify_accepts_any_matching_v1() {
        let verifier = verifier(TEST_SECRET);
        let payload = checkout_payload().as_bytes();
        let good = verifier.generate_test_header(NOW, payload).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", NOW, "0".repeat(64), good_sig);

        assert!(verifier.verify_and_parse_at(payload, &header, NOW).is_ok());
    }

    #[test]
    fn verify_wrong_secret_fails() {
        let payload = checkout_payload().as_bytes();
        let header = verifier("whsec_other").generate_test_header(NOW, payload).unwrap();

        let result = verifier(TEST_SECRET).verify_and_parse_at(payload, &header, NOW);

        assert_eq!(result.unwrap_err(), WebhookError::InvalidSignature);
    }

    #[test]
    fn verify_reserialized_payload_fails() {
        let verifier = verifier(TEST_SECRET);
        let original = checkout_payload();
        let header = verifier.generate_test_header(NOW, original.as_bytes()).unwrap();

        // Semantically equal JSON, different bytes
        let value: serde_json::Value = serde_json::from_str(original).unwrap();
        let pretty = serde_json::to_string_pretty(&value).unwrap();

        let result = verifier.verify_and_parse_at(pretty.as_bytes(), &header, NOW);
        assert_eq!(result.unwrap_err(), WebhookError::InvalidSignature);
    }

    #[test]
    fn signature_is_checked_before_payload_is_parsed() {
        let verifier = verifier(TEST_SECRET);
        let header = format!("t={},v1={}", NOW, "a".repeat(64));

        let result = verifier.verify_and_parse_at(b"not json at all", &header, NOW);

        assert_eq!(result.unwrap_err(), WebhookError::InvalidSignature);
    }

    #[test]
    fn non_utf8_payload_is_signed_verbatim() {
        let verifier = verifier(TEST_SECRET);
        let payload = [0xff, 0xfe, 0x00, 0x7b];
        let header = verifier.generate_test_header(NOW, &payload).unwrap();

        assert!(verifier.verify_signature_at(&payload, &header, NOW).is_ok());
    }

    // ══════════════════════════════════════════════════════════════
    // Timestamp Validation Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn timestamp_at_tolerance_boundary_succeeds() {
        let verifier = verifier(TEST_SECRET);
        let payload = checkout_payload().as_bytes();
        let header = verifier.generate_test_header(NOW - 300, payload).unwrap();

        assert!(verifier.verify_signature_at(payload, &header, NOW).is_ok());
    }

    #[test]
    fn timestamp_past_tolerance_fails() {
        let verifier = verifier(TEST_SECRET);
        let payload = checkout_payload().as_bytes();
        let header = verifier.generate_test_header(NOW - 301, payload).unwrap();

        let result = verifier.verify_signature_at(payload, &header, NOW);
        assert_eq!(result.unwrap_err(), WebhookError::TimestampOutOfRange);
    }

    #[test]
    fn custom_tolerance_is_respected() {
        let verifier = verifier(TEST_SECRET).with_tolerance_secs(30);
        let payload = checkout_payload().as_bytes();
        let header = verifier.generate_test_header(NOW - 60, payload).unwrap();

        let result = verifier.verify_signature_at(payload, &header, NOW);
        assert_eq!(result.unwrap_err(), WebhookError::TimestampOutOfRange);
    }

    #[test]
    fn small_future_skew_is_tolerated() {
        let verifier = verifier(TEST_SECRET);
        let payload = checkout_payload().as_bytes();
        let header = verifier.generate_test_header(NOW + 30, payload).unwrap();

        assert!(verifier.verify_signature_at(payload, &header, NOW).is_ok());
    }

    #[test]
    fn large_future_skew_fails() {
        let verifier = verifier(TEST_SECRET);
        let payload = checkout_payload().as_bytes();
        let header = verifier.generate_test_header(NOW + 120, payload).unwrap();

        let result = verifier.verify_signature_at(payload, &header, NOW);
        assert_eq!(result.unwrap_err(), WebhookError::TimestampOutOfRange);
    }

    // ══════════════════════════════════════════════════════════════
    // Payload Handling Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verified_invalid_json_is_a_parse_error() {
        let verifier = verifier(TEST_SECRET);
        let payload = b"not valid json";
        let header = verifier.generate_test_header(NOW, payload).unwrap();

        let result = verifier.verify_and_parse_at(payload, &header, NOW);
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn test_mode_event_rejected_when_livemode_required() {
        let verifier = verifier(TEST_SECRET).with_require_livemode(true);
        let payload = checkout_payload().as_bytes();
        let header = verifier.generate_test_header(NOW, payload).unwrap();

        let result = verifier.verify_and_parse_at(payload, &header, NOW);
        assert_eq!(result.unwrap_err(), WebhookError::LivemodeMismatch);
    }

    #[test]
    fn authenticate_requires_raw_body() {
        let result = verifier(TEST_SECRET).authenticate(None, Some("t=1,v1=aa"));
        assert_eq!(result.unwrap_err(), WebhookError::MissingInput("raw body"));
    }

    #[test]
    fn authenticate_requires_signature_header() {
        let result = verifier(TEST_SECRET).authenticate(Some(b"{}"), None);
        assert_eq!(
            result.unwrap_err(),
            WebhookError::MissingInput("stripe-signature header")
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Constant Time Comparison Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn constant_time_compare_behaviour() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 3, 4]));
        assert!(constant_time_compare(&[], &[]));
    }

    // ══════════════════════════════════════════════════════════════
    // Authenticity Properties
    // ══════════════════════════════════════════════════════════════

    proptest! {
        #[test]
        fn signed_payload_always_verifies(
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            secret in "[a-zA-Z0-9_]{1,40}",
        ) {
            let verifier = verifier(&secret);
            let header = verifier.generate_test_header(NOW, &payload).unwrap();
            prop_assert!(verifier.verify_signature_at(&payload, &header, NOW).is_ok());
        }

        #[test]
        fn wrong_secret_never_verifies(
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            secret in "[a-z]{1,20}",
            other in "[A-Z]{1,20}",
        ) {
            let header = verifier(&other).generate_test_header(NOW, &payload).unwrap();
            let result = verifier(&secret).verify_signature_at(&payload, &header, NOW);
            prop_assert_eq!(result, Err(WebhookError::InvalidSignature));
        }

        #[test]
        fn tampered_payload_never_verifies(
            payload in proptest::collection::vec(any::<u8>(), 1..512),
            index in any::<proptest::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let verifier = verifier(TEST_SECRET);
            let header = verifier.generate_test_header(NOW, &payload).unwrap();

            let mut tampered = payload.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= flip;

            let result = verifier.verify_signature_at(&tampered, &header, NOW);
            prop_assert_eq!(result, Err(WebhookError::InvalidSignature));
        }

        #[test]
        fn arbitrary_signature_never_verifies(
            payload in proptest::collection::vec(any::<u8>(), 0..256),
            signature in proptest::collection::vec(any::<u8>(), 32),
        ) {
            let verifier = verifier(TEST_SECRET);
            let expected = verifier.generate_test_header(NOW, &payload).unwrap();
            let header = format!("t={},v1={}", NOW, hex::encode(&signature));
            prop_assume!(header != expected);

            let result = verifier.verify_signature_at(&payload, &header, NOW);
            prop_assert_eq!(result, Err(WebhookError::InvalidSignature));
        }
    }
}
