//! Gateway payment confirmation signatures.
//!
//! The gateway signs `"{order_id}|{payment_id}"` with HMAC-SHA256 keyed by
//! the merchant's key secret and hands the lowercase hex digest to the
//! checkout client, which forwards it to us alongside both ids.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing required payment field: {0}")]
    MissingField(&'static str),
    #[error("gateway key secret is not configured")]
    MissingSecret,
}

/// Hex HMAC-SHA256 over the canonical `order_id|payment_id` string.
pub fn expected_signature(gateway_order_id: &str, gateway_payment_id: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Returns `Ok(false)` on any mismatch, including malformed signatures.
/// Missing inputs are reported as errors so they never look like tampering.
pub fn verify_signature(
    gateway_order_id: &str,
    gateway_payment_id: &str,
    claimed_signature: &str,
    secret: &str,
) -> Result<bool, SignatureError> {
    if gateway_order_id.trim().is_empty() {
        return Err(SignatureError::MissingField("gateway_order_id"));
    }
    if gateway_payment_id.trim().is_empty() {
        return Err(SignatureError::MissingField("gateway_payment_id"));
    }
    if claimed_signature.trim().is_empty() {
        return Err(SignatureError::MissingField("signature"));
    }
    if secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }

    let expected = expected_signature(gateway_order_id, gateway_payment_id, secret);
    Ok(expected.as_bytes().ct_eq(claimed_signature.as_bytes()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "rzp_test_secret_9f8e7d";

    #[test]
    fn accepts_gateway_signature() {
        let sig = expected_signature("order_NX12", "pay_ABC99", SECRET);
        assert_eq!(sig.len(), 64);
        assert_eq!(verify_signature("order_NX12", "pay_ABC99", &sig, SECRET), Ok(true));
    }

    #[test]
    fn any_single_character_flip_is_rejected() {
        let sig = expected_signature("order_NX12", "pay_ABC99", SECRET);
        for (idx, ch) in sig.char_indices() {
            let replacement = if ch == '0' { '1' } else { '0' };
            let mut tampered = sig.clone();
            tampered.replace_range(idx..idx + 1, &replacement.to_string());
            assert_eq!(
                verify_signature("order_NX12", "pay_ABC99", &tampered, SECRET),
                Ok(false),
                "flip at {} accepted",
                idx
            );
        }
        let upper = sig.to_uppercase();
        if upper != sig {
            assert_eq!(verify_signature("order_NX12", "pay_ABC99", &upper, SECRET), Ok(false));
        }
    }

    #[test]
    fn ids_are_bound_to_the_signature() {
        let sig = expected_signature("order_NX12", "pay_ABC99", SECRET);
        assert_eq!(verify_signature("order_NX13", "pay_ABC99", &sig, SECRET), Ok(false));
        assert_eq!(verify_signature("order_NX12", "pay_ABC98", &sig, SECRET), Ok(false));
        assert_eq!(verify_signature("order_NX12", "pay_ABC99", &sig, "other"), Ok(false));
    }

    #[test]
    fn malformed_signature_is_invalid_not_an_error() {
        assert_eq!(verify_signature("o", "p", "not-hex-at-all", SECRET), Ok(false));
        assert_eq!(verify_signature("o", "p", "abc", SECRET), Ok(false));
    }

    #[test]
    fn missing_inputs_are_distinct_from_mismatch() {
        assert_eq!(
            verify_signature("", "pay", "sig", SECRET),
            Err(SignatureError::MissingField("gateway_order_id"))
        );
        assert_eq!(
            verify_signature("order", " ", "sig", SECRET),
            Err(SignatureError::MissingField("gateway_payment_id"))
        );
        assert_eq!(
            verify_signature("order", "pay", "", SECRET),
            Err(SignatureError::MissingField("signature"))
        );
        assert_eq!(verify_signature("order", "pay", "sig", ""), Err(SignatureError::MissingSecret));
    }
}
