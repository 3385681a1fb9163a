use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::{handlers::orders::OrderDto, state::AppState},
    domain::{BuyerDetails, NewOrderItem, OrderDraft},
    error::{AppError, Result},
    payments::PaymentConfirmation,
    service::RecordedOrder,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub store_id: Uuid,
    #[validate(length(min = 1, message = "buyer name is required"))]
    pub buyer_name: String,
    #[validate(email(message = "buyer email is not a valid address"))]
    pub buyer_email: Option<String>,
    pub buyer_phone: Option<String>,
    pub buyer_address: Option<String>,
    #[validate(range(min = 1, message = "total must be positive"))]
    pub total_price_cents: i64,
    #[validate(length(min = 1, message = "at least one item is required"), nested)]
    pub items: Vec<CheckoutItem>,
    pub referral_session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CheckoutItem {
    /// Must be a well-formed product id; nothing is substituted for it.
    pub product_id: String,
    #[validate(length(min = 1, message = "item name is required"))]
    pub name: String,
    pub image: Option<String>,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i64,
    #[validate(range(min = 0, message = "price cannot be negative"))]
    pub price_at_purchase_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct OnlineCheckoutRequest {
    #[serde(flatten)]
    pub order: CheckoutRequest,
    #[serde(default)]
    pub gateway_order_id: String,
    #[serde(default)]
    pub gateway_payment_id: String,
    #[serde(default)]
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order: OrderDto,
    /// False when an earlier order for the same payment was returned.
    pub created: bool,
}

impl TryFrom<CheckoutRequest> for OrderDraft {
    type Error = AppError;

    fn try_from(request: CheckoutRequest) -> Result<Self> {
        let items = request
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let product_id = Uuid::parse_str(item.product_id.trim()).map_err(|_| {
                    AppError::Validation(format!(
                        "items[{}].product_id '{}' is not a valid product reference",
                        index, item.product_id
                    ))
                })?;
                Ok(NewOrderItem {
                    product_id,
                    product_name: item.name,
                    product_image: item.image,
                    quantity: item.quantity,
                    price_at_purchase_cents: item.price_at_purchase_cents,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderDraft {
            store_id: request.store_id,
            buyer: BuyerDetails {
                name: request.buyer_name,
                email: request.buyer_email,
                phone: request.buyer_phone,
                address: request.buyer_address,
            },
            total_price_cents: request.total_price_cents,
            items,
            referral_session_id: request.referral_session_id,
        })
    }
}

fn respond(recorded: RecordedOrder) -> (StatusCode, Json<CheckoutResponse>) {
    let status = if recorded.created { StatusCode::CREATED } else { StatusCode::OK };
    (
        status,
        Json(CheckoutResponse {
            order: recorded.order.into(),
            created: recorded.created,
        }),
    )
}

pub async fn checkout_cod(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    request.validate()?;
    let draft = OrderDraft::try_from(request)?;

    let recorded = state.service_context.checkout_service.checkout_cod(draft).await?;
    Ok(respond(recorded))
}

pub async fn checkout_online(
    State(state): State<AppState>,
    Json(request): Json<OnlineCheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    request.order.validate()?;
    let draft = OrderDraft::try_from(request.order)?;
    let confirmation = PaymentConfirmation {
        gateway_order_id: request.gateway_order_id,
        gateway_payment_id: request.gateway_payment_id,
        signature: request.signature,
    };

    let recorded = state
        .service_context
        .checkout_service
        .checkout_online(draft, confirmation, state.settings.gateway.mode)
        .await?;
    Ok(respond(recorded))
}
