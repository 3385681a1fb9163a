use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::PayoutStatus;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    /// Gateway secret is absent. Distinct from `Security` so operators can
    /// tell misconfiguration from tampering.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Payment signature mismatch for payment {gateway_payment_id}")]
    Security { gateway_payment_id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Ledger failure: {message}")]
    LedgerFailure {
        message: String,
        gateway_payment_id: Option<String>,
    },

    #[error("Payout blocked: {0}")]
    PayoutBlocked(PayoutBlockReason),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("External service error: {0}")]
    External(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PayoutBlockReason {
    MissingPayoutDestination,
    NotPending { status: PayoutStatus },
}

impl std::fmt::Display for PayoutBlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutBlockReason::MissingPayoutDestination => {
                write!(f, "seller has no payout destination on file")
            }
            PayoutBlockReason::NotPending { status } => {
                write!(f, "payout request is not pending (currently {})", status.as_str())
            }
        }
    }
}

impl AppError {
    /// Stable machine-readable kind, returned alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Validation(_) => "validation",
            AppError::Configuration(_) => "configuration",
            AppError::Security { .. } => "security",
            AppError::Conflict(_) => "conflict",
            AppError::LedgerFailure { .. } => "ledger_failure",
            AppError::PayoutBlocked(PayoutBlockReason::MissingPayoutDestination) => {
                "missing_payout_destination"
            }
            AppError::PayoutBlocked(PayoutBlockReason::NotPending { .. }) => "not_pending",
            AppError::Internal(_) => "internal",
            AppError::External(_) => "external",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, error_message) = match self {
            AppError::Database(ref msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Configuration(ref msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Online payments are temporarily unavailable.".to_string(),
                )
            }
            AppError::Security { .. } => (
                StatusCode::PAYMENT_REQUIRED,
                "Payment could not be verified. Please retry the payment.".to_string(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::LedgerFailure { ref message, ref gateway_payment_id } => {
                tracing::error!("Ledger failure: {}", message);
                let msg = match gateway_payment_id {
                    Some(payment_id) => format!(
                        "Payment {} was received but the order could not be recorded. \
                         Please contact support with this payment id.",
                        payment_id
                    ),
                    None => "The order could not be recorded. Please try again.".to_string(),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::PayoutBlocked(ref reason) => (StatusCode::CONFLICT, reason.to_string()),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::External(ref msg) => {
                tracing::error!("External service error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
