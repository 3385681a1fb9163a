pub mod signature;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use signature::{verify_signature, SignatureError};

pub use signature::expected_signature;

/// Gateway confirmation as forwarded by the checkout client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

/// A confirmation whose signature has been checked. Only
/// [`PaymentConfirmation::verify`] can produce one.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    gateway_order_id: String,
    gateway_payment_id: String,
    signature: String,
}

impl VerifiedPayment {
    pub fn gateway_order_id(&self) -> &str {
        &self.gateway_order_id
    }

    pub fn gateway_payment_id(&self) -> &str {
        &self.gateway_payment_id
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }
}

impl PaymentConfirmation {
    pub fn verify(self, key_secret: Option<&str>) -> Result<VerifiedPayment> {
        let outcome = verify_signature(
            &self.gateway_order_id,
            &self.gateway_payment_id,
            &self.signature,
            key_secret.unwrap_or_default(),
        );

        match outcome {
            Ok(true) => Ok(VerifiedPayment {
                gateway_order_id: self.gateway_order_id,
                gateway_payment_id: self.gateway_payment_id,
                signature: self.signature,
            }),
            Ok(false) => {
                tracing::warn!(
                    gateway_order_id = %self.gateway_order_id,
                    gateway_payment_id = %self.gateway_payment_id,
                    "Payment signature mismatch, possible tampering"
                );
                Err(AppError::Security {
                    gateway_payment_id: self.gateway_payment_id,
                })
            }
            Err(SignatureError::MissingField(field)) => Err(AppError::Validation(format!(
                "missing required payment field: {}",
                field
            ))),
            Err(e @ SignatureError::MissingSecret) => {
                tracing::error!("Cannot verify payment {}: {}", self.gateway_payment_id, e);
                Err(AppError::Configuration(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation(signature: String) -> PaymentConfirmation {
        PaymentConfirmation {
            gateway_order_id: "order_1".to_string(),
            gateway_payment_id: "pay_1".to_string(),
            signature,
        }
    }

    #[test]
    fn verify_yields_verified_payment() {
        let sig = expected_signature("order_1", "pay_1", "secret");
        let verified = confirmation(sig.clone()).verify(Some("secret")).unwrap();
        assert_eq!(verified.gateway_payment_id(), "pay_1");
        assert_eq!(verified.signature(), sig);
    }

    #[test]
    fn error_kinds_are_distinct() {
        let bad = confirmation("deadbeef".to_string()).verify(Some("secret")).unwrap_err();
        assert!(matches!(bad, AppError::Security { .. }));

        let no_secret = confirmation("deadbeef".to_string()).verify(None).unwrap_err();
        assert!(matches!(no_secret, AppError::Configuration(_)));

        let missing = confirmation(String::new()).verify(Some("secret")).unwrap_err();
        assert!(matches!(missing, AppError::Validation(_)));
    }
}
