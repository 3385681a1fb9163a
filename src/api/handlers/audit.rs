use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    api::state::AppState,
    domain::AuditEntry,
    error::Result,
};

#[derive(Debug, Deserialize)]
pub struct AuditParams {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    100
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<AuditParams>,
) -> Result<Json<Vec<AuditEntry>>> {
    let entries = state.service_context.audit_log
        .list_recent(params.limit.clamp(1, 1000))
        .await?;
    Ok(Json(entries))
}
