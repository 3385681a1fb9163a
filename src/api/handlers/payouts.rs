use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentAdmin, state::AppState},
    domain::{format_cents, BankDetail, PayoutRequest, PayoutStatus},
    error::{AppError, Result},
    service::{PayoutRunReport, SellerFailure},
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    status: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct PayoutDto {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub store_id: Uuid,
    pub total_earned_cents: i64,
    pub platform_fee_cents: i64,
    pub final_amount_cents: i64,
    pub total_earned: String,
    pub platform_fee: String,
    pub final_amount: String,
    pub order_ids: Vec<Uuid>,
    pub status: PayoutStatus,
    pub week_start_date: String,
    pub week_end_date: String,
    pub paid_at: Option<String>,
    pub paid_by: Option<String>,
    pub admin_notes: Option<String>,
    pub proof_url: Option<String>,
    pub created_at: String,
}

impl From<PayoutRequest> for PayoutDto {
    fn from(payout: PayoutRequest) -> Self {
        Self {
            id: payout.id,
            seller_id: payout.seller_id,
            store_id: payout.store_id,
            total_earned: format_cents(payout.total_earned_cents),
            platform_fee: format_cents(payout.platform_fee_cents),
            final_amount: format_cents(payout.final_amount_cents),
            total_earned_cents: payout.total_earned_cents,
            platform_fee_cents: payout.platform_fee_cents,
            final_amount_cents: payout.final_amount_cents,
            order_ids: payout.order_ids,
            status: payout.status,
            week_start_date: payout.week_start_date.to_string(),
            week_end_date: payout.week_end_date.to_string(),
            paid_at: payout.paid_at.map(|dt| dt.to_rfc3339()),
            paid_by: payout.paid_by,
            admin_notes: payout.admin_notes,
            proof_url: payout.proof_url,
            created_at: payout.created_at.to_rfc3339(),
        }
    }
}

/// Seller destination as shown to the admin processing the payout.
#[derive(Debug, Serialize)]
pub struct DestinationDto {
    pub account_holder_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub routing_code: String,
    pub alias_id: Option<String>,
    pub payout_method: String,
    pub display: String,
}

impl From<BankDetail> for DestinationDto {
    fn from(detail: BankDetail) -> Self {
        Self {
            display: detail.masked_destination(),
            payout_method: detail.payout_method.as_str().to_string(),
            account_holder_name: detail.account_holder_name,
            bank_name: detail.bank_name,
            account_number: detail.account_number,
            routing_code: detail.routing_code,
            alias_id: detail.alias_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PayoutDetailResponse {
    pub payout: PayoutDto,
    pub destination: Option<DestinationDto>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    payouts: Vec<PayoutDto>,
    total: usize,
}

#[derive(Debug, Deserialize, Default)]
pub struct MarkPaidRequest {
    pub proof_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RejectRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunReportResponse {
    created: Vec<PayoutDto>,
    failed: Vec<SellerFailure>,
}

impl From<PayoutRunReport> for RunReportResponse {
    fn from(report: PayoutRunReport) -> Self {
        Self {
            created: report.created.into_iter().map(Into::into).collect(),
            failed: report.failed,
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let status = match params.status.as_deref() {
        Some(s) => Some(PayoutStatus::parse(s)
            .ok_or_else(|| AppError::Validation(format!("Unknown payout status: {}", s)))?),
        None => None,
    };

    let payouts = state.service_context.payout_processor
        .list(status, params.limit, params.offset)
        .await?;

    let total = payouts.len();
    let payouts = payouts.into_iter().map(Into::into).collect();

    Ok(Json(ListResponse { payouts, total }))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PayoutDetailResponse>> {
    let view = state.service_context.payout_processor.get_with_destination(id).await?;
    Ok(Json(PayoutDetailResponse {
        payout: view.payout.into(),
        destination: view.bank_detail.map(Into::into),
    }))
}

pub async fn generate(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
) -> Result<Json<RunReportResponse>> {
    tracing::info!("Admin {} triggered payout generation", admin.admin_id);
    let report = state.service_context.payout_generator.run().await?;
    Ok(Json(report.into()))
}

pub async fn mark_paid(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<Uuid>,
    request: Option<Json<MarkPaidRequest>>,
) -> Result<Json<PayoutDto>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let payout = state.service_context.payout_processor
        .mark_paid(id, request.proof_url, request.notes, &admin.admin_id)
        .await?;
    Ok(Json(payout.into()))
}

pub async fn reject(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<Uuid>,
    request: Option<Json<RejectRequest>>,
) -> Result<Json<PayoutDto>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let payout = state.service_context.payout_processor
        .reject(id, request.notes, &admin.admin_id)
        .await?;
    Ok(Json(payout.into()))
}
