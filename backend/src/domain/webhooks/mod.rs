//! Webhook authenticity checks and the webhook error taxonomy.

mod errors;
mod identity_verifier;
mod payment_verifier;

pub use errors::WebhookError;
pub use identity_verifier::{IdentityDeliveryHeaders, IdentityEventEnvelope, IdentitySignatureVerifier};
pub use payment_verifier::{
    PaymentEventData, PaymentEventEnvelope, PaymentSignatureVerifier, SignatureHeader,
};

#[cfg(test)]
pub use identity_verifier::sign_identity_payload;
#[cfg(test)]
pub use payment_verifier::sign_payment_payload;

use subtle::ConstantTimeEq;

/// Constant-time comparison of two signatures.
pub(crate) fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_compare_cases() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
        assert!(!constant_time_compare(&[1, 2], &[1, 2, 3]));
        assert!(constant_time_compare(&[], &[]));
    }
}
