use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentAdmin, state::AppState},
    domain::{format_cents, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus},
    error::Result,
};

#[derive(Debug, Serialize)]
pub struct OrderDto {
    pub id: Uuid,
    pub store_id: Uuid,
    pub buyer_name: String,
    pub buyer_email: Option<String>,
    pub buyer_phone: Option<String>,
    pub buyer_address: Option<String>,
    pub total_price_cents: i64,
    pub total_price: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub notes: Option<String>,
    pub paid_at: Option<String>,
    pub delivered_at: Option<String>,
    pub created_at: String,
    pub items: Vec<OrderItem>,
}

impl From<Order> for OrderDto {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            store_id: order.store_id,
            buyer_name: order.buyer_name,
            buyer_email: order.buyer_email,
            buyer_phone: order.buyer_phone,
            buyer_address: order.buyer_address,
            total_price: format_cents(order.total_price_cents),
            total_price_cents: order.total_price_cents,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            status: order.status,
            gateway_order_id: order.gateway_order_id,
            gateway_payment_id: order.gateway_payment_id,
            notes: order.notes,
            paid_at: order.paid_at.map(|dt| dt.to_rfc3339()),
            delivered_at: order.delivered_at.map(|dt| dt.to_rfc3339()),
            created_at: order.created_at.to_rfc3339(),
            items: order.items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDto>> {
    let order = state.service_context.order_service.get(id).await?;
    Ok(Json(order.into()))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderDto>> {
    tracing::debug!("Admin {} setting order {} to {}", admin.admin_id, id, request.status.as_str());
    let order = state.service_context.order_service
        .update_status(id, request.status)
        .await?;
    Ok(Json(order.into()))
}

pub async fn settle_cod(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDto>> {
    tracing::debug!("Admin {} settling COD payment for order {}", admin.admin_id, id);
    let order = state.service_context.order_service.settle_cod_payment(id).await?;
    Ok(Json(order.into()))
}
