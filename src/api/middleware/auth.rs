use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::{
    api::state::AppState,
    error::AppError,
};

pub const ADMIN_ID_HEADER: &str = "x-admin-id";

/// Acting administrator, recorded as `paid_by` and in logs.
#[derive(Clone, Debug)]
pub struct CurrentAdmin {
    pub admin_id: String,
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let expected = state.settings.auth.admin_api_key.as_bytes();
    if expected.is_empty() || !bool::from(token.as_bytes().ct_eq(expected)) {
        tracing::warn!("Rejected admin request to {}", request.uri().path());
        return Err(AppError::Unauthorized);
    }

    let admin_id = request
        .headers()
        .get(ADMIN_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("admin")
        .to_string();

    request.extensions_mut().insert(CurrentAdmin { admin_id });

    Ok(next.run(request).await)
}
