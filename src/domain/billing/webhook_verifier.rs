//! Webhook signature verification.
//!
//! Verifies HMAC-SHA256 signatures over the raw request body and rejects
//! replayed deliveries by timestamp.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::gateway_event::GatewayEvent;
use super::webhook_errors::WebhookError;

/// Default maximum age for webhook deliveries (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Maximum allowed clock skew for future timestamps (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

type HmacSha256 = Hmac<Sha256>;

/// Parsed components of the `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,

    /// Every v1 signature present. More than one appears during secret rotation.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<signature>[,v1=<signature>...][,v0=<legacy>]`.
    /// Unknown keys, including `v0`, are ignored.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::ParseError` if the header format is invalid.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifier for gateway webhook signatures.
pub struct WebhookVerifier {
    secret: SecretString,
    tolerance_secs: i64,
    require_livemode: bool,
}

impl WebhookVerifier {
    /// Creates a verifier with the default tolerance that accepts test-mode events.
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            require_livemode: false,
        }
    }

    /// Sets the maximum accepted delivery age in seconds.
    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Rejects test-mode events when set.
    pub fn with_require_livemode(mut self, require_livemode: bool) -> Self {
        self.require_livemode = require_livemode;
        self
    }

    /// Verifies the signature against the current clock and parses the event.
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<GatewayEvent, WebhookError> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Verifies the signature as of `now` (Unix seconds) and parses the event.
    ///
    /// # Verification Steps
    ///
    /// 1. Require and parse the signature header
    /// 2. Validate the timestamp against the replay window
    /// 3. Compare every v1 signature in constant time
    /// 4. Parse the verified bytes into a `GatewayEvent`
    /// 5. Enforce livemode if configured
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
        now: i64,
    ) -> Result<GatewayEvent, WebhookError> {
        let header = signature_header
            .filter(|h| !h.trim().is_empty())
            .ok_or(WebhookError::MissingSignature)?;
        let header = SignatureHeader::parse(header)?;

        self.validate_timestamp(header.timestamp, now)?;

        let expected = compute_signature(
            self.secret.expose_secret().as_bytes(),
            header.timestamp,
            payload,
        )?;
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if !matched {
            return Err(WebhookError::InvalidSignature);
        }

        let event: GatewayEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        if self.require_livemode && !event.is_live() {
            return Err(WebhookError::LivemodeMismatch);
        }

        Ok(event)
    }

    fn validate_timestamp(&self, timestamp: i64, now: i64) -> Result<(), WebhookError> {
        let age = now - timestamp;

        if age > self.tolerance_secs {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }

        Ok(())
    }
}

/// Computes the raw HMAC-SHA256 over `"{timestamp}." || payload`.
///
/// The payload bytes are fed to the MAC unchanged.
fn compute_signature(secret: &[u8], timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Produces a complete signature header value for `payload`.
///
/// Used by delivery simulators and tests to sign fixtures the same way the
/// gateway does.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return format!("t={}", timestamp),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
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

    const TEST_SECRET: &str = "whsec_test_secret_12345";
    const NOW: i64 = 1_735_689_600;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SecretString::new(TEST_SECRET.to_string()))
    }

    fn payload() -> String {
        serde_json::json!({
            "id": "evt_test123",
            "type": "checkout.session.completed",
            "created": NOW,
            "data": {"object": {"id": "cs_1", "customer": "cus_1"}},
            "livemode": false
        })
        .to_string()
    }

    // ══════════════════════════════════════════════════════════════
    // SignatureHeader Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_header_with_v1_only() {
        let header = SignatureHeader::parse(&format!("t=1234567890,v1={}", "a".repeat(64))).unwrap();

        assert_eq!(header.timestamp, 1234567890);
        assert_eq!(header.v1_signatures.len(), 1);
        assert_eq!(header.v1_signatures[0].len(), 32);
    }

    #[test]
    fn parse_header_collects_multiple_v1() {
        let header_str = format!(
            "t=1234567890,v1={},v1={},v0={}",
            "a".repeat(64),
            "b".repeat(64),
            "c".repeat(64)
        );

        let header = SignatureHeader::parse(&header_str).unwrap();

        assert_eq!(header.v1_signatures.len(), 2);
    }

    #[test]
    fn parse_header_ignores_unknown_fields() {
        let header_str = format!("t=1234567890,v1={},scheme=hmac", "a".repeat(64));
        assert!(SignatureHeader::parse(&header_str).is_ok());
    }

    #[test]
    fn parse_header_missing_timestamp_fails() {
        let result = SignatureHeader::parse(&format!("v1={}", "a".repeat(64)));
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn parse_header_missing_v1_fails() {
        let result = SignatureHeader::parse("t=1234567890");
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn parse_header_invalid_hex_fails() {
        let result = SignatureHeader::parse("t=1234567890,v1=not_valid_hex");
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn parse_header_no_equals_fails() {
        let result = SignatureHeader::parse("t1234567890");
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_valid_signature() {
        let body = payload();
        let header = sign_payload(TEST_SECRET, NOW, body.as_bytes());

        let event = verifier()
            .verify_at(body.as_bytes(), Some(&header), NOW)
            .unwrap();

        assert_eq!(event.id, "evt_test123");
    }

    #[test]
    fn verify_missing_header_fails() {
        let body = payload();
        let result = verifier().verify_at(body.as_bytes(), None, NOW);
        assert_eq!(result.unwrap_err(), WebhookError::MissingSignature);
    }

    #[test]
    fn verify_blank_header_fails() {
        let body = payload();
        let result = verifier().verify_at(body.as_bytes(), Some("  "), NOW);
        assert_eq!(result.unwrap_err(), WebhookError::MissingSignature);
    }

    #[test]
    fn verify_wrong_secret_fails() {
        let body = payload();
        let header = sign_payload("whsec_other", NOW, body.as_bytes());

        let result = verifier().verify_at(body.as_bytes(), Some(&header), NOW);

        assert_eq!(result.unwrap_err(), WebhookError::InvalidSignature);
    }

    #[test]
    fn verify_accepts_any_matching_v1() {
        let body = payload();
        let good = sign_payload(TEST_SECRET, NOW, body.as_bytes());
        let good_sig = good.split_once("v1=").unwrap().1;
        let header = format!("t={},v1={},v1={}", NOW, "0".repeat(64), good_sig);

        assert!(verifier().verify_at(body.as_bytes(), Some(&header), NOW).is_ok());
    }

    #[test]
    fn verify_every_single_byte_mutation_fails() {
        let body = payload();
        let header = sign_payload(TEST_SECRET, NOW, body.as_bytes());

        for i in 0..body.len() {
            let mut tampered = body.clone().into_bytes();
            tampered[i] ^= 0x01;
            let result = verifier().verify_at(&tampered, Some(&header), NOW);
            assert_eq!(
                result.unwrap_err(),
                WebhookError::InvalidSignature,
                "mutation at byte {} was accepted",
                i
            );
        }
    }

    #[test]
    fn verify_uses_raw_bytes_not_reencoded_json() {
        let body = "{\"id\":\"evt_1\",  \"type\":\"x\",\"created\":1,\"data\":{\"object\":{}}}";
        let header = sign_payload(TEST_SECRET, NOW, body.as_bytes());
        let reencoded = serde_json::to_string(&serde_json::from_str::<serde_json::Value>(body).unwrap()).unwrap();

        assert!(verifier().verify_at(body.as_bytes(), Some(&header), NOW).is_ok());
        assert_eq!(
            verifier()
                .verify_at(reencoded.as_bytes(), Some(&header), NOW)
                .unwrap_err(),
            WebhookError::InvalidSignature
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Timestamp Validation Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn timestamp_at_boundary_succeeds() {
        assert!(verifier().validate_timestamp(NOW - 300, NOW).is_ok());
    }

    #[test]
    fn timestamp_just_past_boundary_fails() {
        assert_eq!(
            verifier().validate_timestamp(NOW - 301, NOW),
            Err(WebhookError::TimestampOutOfRange)
        );
    }

    #[test]
    fn timestamp_within_skew_succeeds() {
        assert!(verifier().validate_timestamp(NOW + 30, NOW).is_ok());
    }

    #[test]
    fn timestamp_beyond_skew_fails() {
        assert_eq!(
            verifier().validate_timestamp(NOW + 120, NOW),
            Err(WebhookError::InvalidTimestamp)
        );
    }

    #[test]
    fn custom_tolerance_is_honoured() {
        let v = verifier().with_tolerance_secs(600);
        assert!(v.validate_timestamp(NOW - 500, NOW).is_ok());
    }

    #[test]
    fn stale_but_correctly_signed_delivery_fails() {
        let body = payload();
        let header = sign_payload(TEST_SECRET, NOW - 3600, body.as_bytes());

        let result = verifier().verify_at(body.as_bytes(), Some(&header), NOW);

        assert_eq!(result.unwrap_err(), WebhookError::TimestampOutOfRange);
    }

    // ══════════════════════════════════════════════════════════════
    // Payload Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verified_but_unparseable_body_fails() {
        let body = "not valid json";
        let header = sign_payload(TEST_SECRET, NOW, body.as_bytes());

        let result = verifier().verify_at(body.as_bytes(), Some(&header), NOW);

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn require_livemode_rejects_test_events() {
        let body = payload();
        let header = sign_payload(TEST_SECRET, NOW, body.as_bytes());

        let result = verifier()
            .with_require_livemode(true)
            .verify_at(body.as_bytes(), Some(&header), NOW);

        assert_eq!(result.unwrap_err(), WebhookError::LivemodeMismatch);
    }

    #[test]
    fn constant_time_compare_different_lengths() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 3, 4]));
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
    }
}
