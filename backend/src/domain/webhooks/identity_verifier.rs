//! Identity provider (Clerk, delivered via Svix) webhook verification.
//!
//! Three headers accompany each delivery: `svix-id`, `svix-timestamp` and
//! `svix-signature`. The signed content is `"{id}.{timestamp}.{raw body}"`,
//! keyed with the base64-decoded part of the `whsec_` secret. The signature
//! header is a space-separated list of `v1,<base64 hmac>` entries.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::{constant_time_compare, WebhookError};

/// Tolerance in both directions around the signed timestamp (5 minutes).
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

const SECRET_PREFIX: &str = "whsec_";

/// The three delivery headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDeliveryHeaders {
    pub message_id: String,
    pub timestamp: String,
    pub signature: String,
}

/// Verified identity event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityEventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: serde_json::Value,
}

/// Verifier for identity webhook signatures.
pub struct IdentitySignatureVerifier {
    key: Vec<u8>,
}

impl IdentitySignatureVerifier {
    /// Creates a verifier from a `whsec_<base64>` secret.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the secret is not valid base64.
    pub fn new(secret: &str) -> Result<Self, WebhookError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| WebhookError::ParseError("webhook secret is not base64".to_string()))?;
        Ok(Self { key })
    }

    /// Verifies a delivery and parses its envelope.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        headers: &IdentityDeliveryHeaders,
    ) -> Result<IdentityEventEnvelope, WebhookError> {
        self.verify_at(payload, headers, chrono::Utc::now().timestamp())?;
        serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    fn verify_at(
        &self,
        payload: &[u8],
        headers: &IdentityDeliveryHeaders,
        now: i64,
    ) -> Result<(), WebhookError> {
        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| WebhookError::ParseError("invalid svix-timestamp".to_string()))?;

        if now - timestamp > TIMESTAMP_TOLERANCE_SECS {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if timestamp - now > TIMESTAMP_TOLERANCE_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }

        let expected = self.compute_signature(&headers.message_id, timestamp, payload)?;

        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .filter_map(|(_, encoded)| STANDARD.decode(encoded).ok())
            .any(|candidate| constant_time_compare(&expected, &candidate));

        if matched {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }

    fn compute_signature(
        &self,
        message_id: &str,
        timestamp: i64,
        payload: &[u8],
    ) -> Result<Vec<u8>, WebhookError> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(&self.key).map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(format!("{}.{}.", message_id, timestamp).as_bytes());
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Builds a valid `svix-signature` value for test fixtures.
#[cfg(test)]
pub fn sign_identity_payload(secret: &str, message_id: &str, timestamp: i64, payload: &str) -> String {
    let key = STANDARD
        .decode(secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret))
        .unwrap();
    let mut mac = Hmac::<Sha256>::new_from_slice(&key).unwrap();
    mac.update(format!("{}.{}.{}", message_id, timestamp, payload).as_bytes());
    format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // "stage-ai-test-key" base64 encoded
    const TEST_SECRET: &str = "whsec_c3RhZ2UtYWktdGVzdC1rZXk=";

    fn body() -> &'static str {
        r#"{"type":"user.created","data":{"id":"user_1","first_name":"Ada"}}"#
    }

    fn headers(timestamp: i64, signature: String) -> IdentityDeliveryHeaders {
        IdentityDeliveryHeaders {
            message_id: "msg_1".to_string(),
            timestamp: timestamp.to_string(),
            signature,
        }
    }

    #[test]
    fn rejects_non_base64_secret() {
        assert!(IdentitySignatureVerifier::new("whsec_***").is_err());
    }

    #[test]
    fn verifies_and_parses_valid_delivery() {
        let verifier = IdentitySignatureVerifier::new(TEST_SECRET).unwrap();
        let ts = chrono::Utc::now().timestamp();
        let sig = sign_identity_payload(TEST_SECRET, "msg_1", ts, body());

        let event = verifier.verify_and_parse(body().as_bytes(), &headers(ts, sig)).unwrap();

        assert_eq!(event.event_type, "user.created");
        assert_eq!(event.data["id"], "user_1");
    }

    #[test]
    fn accepts_any_matching_entry_in_list() {
        let verifier = IdentitySignatureVerifier::new(TEST_SECRET).unwrap();
        let ts = 1_700_000_000;
        let good = sign_identity_payload(TEST_SECRET, "msg_1", ts, body());
        let sig = format!("v1,AAAA {} v2,zzz", good);

        assert!(verifier.verify_at(body().as_bytes(), &headers(ts, sig), ts).is_ok());
    }

    #[test]
    fn rejects_signature_for_other_message_id() {
        let verifier = IdentitySignatureVerifier::new(TEST_SECRET).unwrap();
        let ts = 1_700_000_000;
        let sig = sign_identity_payload(TEST_SECRET, "msg_other", ts, body());

        let result = verifier.verify_at(body().as_bytes(), &headers(ts, sig), ts);

        assert_eq!(result, Err(WebhookError::InvalidSignature));
    }

    #[test]
    fn rejects_tampered_body() {
        let verifier = IdentitySignatureVerifier::new(TEST_SECRET).unwrap();
        let ts = 1_700_000_000;
        let sig = sign_identity_payload(TEST_SECRET, "msg_1", ts, body());
        let tampered = body().replace("Ada", "Eve");

        let result = verifier.verify_at(tampered.as_bytes(), &headers(ts, sig), ts);

        assert_eq!(result, Err(WebhookError::InvalidSignature));
    }

    #[test]
    fn enforces_timestamp_tolerance() {
        let verifier = IdentitySignatureVerifier::new(TEST_SECRET).unwrap();
        let ts = 1_700_000_000;
        let sig = sign_identity_payload(TEST_SECRET, "msg_1", ts, body());

        assert_eq!(
            verifier.verify_at(body().as_bytes(), &headers(ts, sig.clone()), ts + 301),
            Err(WebhookError::TimestampOutOfRange)
        );
        assert_eq!(
            verifier.verify_at(body().as_bytes(), &headers(ts, sig), ts - 301),
            Err(WebhookError::InvalidTimestamp)
        );
    }

    #[test]
    fn rejects_unparseable_timestamp() {
        let verifier = IdentitySignatureVerifier::new(TEST_SECRET).unwrap();
        let h = IdentityDeliveryHeaders {
            message_id: "msg_1".to_string(),
            timestamp: "yesterday".to_string(),
            signature: "v1,AAAA".to_string(),
        };
        assert!(matches!(
            verifier.verify_at(body().as_bytes(), &h, 0),
            Err(WebhookError::ParseError(_))
        ));
    }
}
