use chrono::Utc;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    config::{GatewayMode, LedgerConfig},
    domain::*,
    error::{AppError, Result},
    repository::{AuditLogRepository, OrderRepository, StoreRepository},
};

const TEST_MODE_NOTE: &str = "Test order (gateway test mode)";

/// Result of a ledger write. `created` is false when an earlier order for
/// the same gateway payment was returned instead.
#[derive(Debug, Clone)]
pub struct RecordedOrder {
    pub order: Order,
    pub store: Store,
    pub created: bool,
}

pub struct OrderLedger {
    store_repo: Arc<dyn StoreRepository>,
    order_repo: Arc<dyn OrderRepository>,
    audit_log: Arc<dyn AuditLogRepository>,
    config: LedgerConfig,
}

impl OrderLedger {
    pub fn new(
        store_repo: Arc<dyn StoreRepository>,
        order_repo: Arc<dyn OrderRepository>,
        audit_log: Arc<dyn AuditLogRepository>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store_repo,
            order_repo,
            audit_log,
            config,
        }
    }

    /// Records an order and its items as one unit. Online requests carry a
    /// payment that has already passed signature verification.
    pub async fn create_order(&self, request: CreateOrderRequest, mode: GatewayMode) -> Result<RecordedOrder> {
        validate(&request)?;

        let store = self.store_repo.find_by_id(request.store_id).await?
            .ok_or_else(|| AppError::NotFound("Store not found".to_string()))?;

        if let OrderPayment::Online(payment) = &request.payment {
            if let Some(existing) = self.order_repo.find_by_gateway_payment_id(payment.gateway_payment_id()).await? {
                return replay(existing, store, &request);
            }
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let (payment_status, paid_at, gateway_order_id, gateway_payment_id, gateway_signature) =
            match &request.payment {
                OrderPayment::CashOnDelivery => (PaymentStatus::Pending, None, None, None, None),
                OrderPayment::Online(payment) => (
                    PaymentStatus::Paid,
                    Some(now),
                    Some(payment.gateway_order_id().to_string()),
                    Some(payment.gateway_payment_id().to_string()),
                    Some(payment.signature().to_string()),
                ),
            };

        let items: Vec<OrderItem> = request
            .items
            .iter()
            .map(|item| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: item.product_id,
                product_name: item.product_name.clone(),
                product_image: item.product_image.clone(),
                quantity: item.quantity,
                price_at_purchase_cents: item.price_at_purchase_cents,
            })
            .collect();

        let mut order = Order {
            id: order_id,
            store_id: store.id,
            buyer_name: request.buyer.name.trim().to_string(),
            buyer_email: request.buyer.email.clone(),
            buyer_phone: request.buyer.phone.clone(),
            buyer_address: request.buyer.address.clone(),
            total_price_cents: request.total_price_cents,
            payment_method: request.payment.method(),
            payment_status,
            status: OrderStatus::Pending,
            gateway_order_id,
            gateway_payment_id,
            gateway_signature,
            notes: match mode {
                GatewayMode::Test => Some(TEST_MODE_NOTE.to_string()),
                GatewayMode::Live => None,
            },
            paid_at,
            delivered_at: None,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        };

        match self.order_repo.insert_order(&order).await {
            Ok(()) => {}
            Err(AppError::Conflict(msg)) => {
                // Lost a race with a concurrent submission of the same payment.
                let existing = match order.gateway_payment_id.as_deref() {
                    Some(payment_id) => self.order_repo.find_by_gateway_payment_id(payment_id).await?,
                    None => None,
                };
                return match existing {
                    Some(existing) => replay(existing, store, &request),
                    None => Err(AppError::Conflict(msg)),
                };
            }
            Err(e) => return Err(e),
        }

        if let Err(e) = self.order_repo.insert_items(order.id, &items).await {
            tracing::warn!("Item write failed for order {}: {}", order.id, e);
            self.compensate(order.id).await;
            return Err(AppError::LedgerFailure {
                message: format!("order items could not be recorded: {}", e),
                gateway_payment_id: order.gateway_payment_id.clone(),
            });
        }

        order.items = items;

        tracing::info!(
            "Recorded {} order {} for store {} ({} items, total {})",
            order.payment_method.as_str(),
            order.id,
            order.store_id,
            order.items.len(),
            format_cents(order.total_price_cents)
        );

        Ok(RecordedOrder {
            order,
            store,
            created: true,
        })
    }

    /// Deletes an order whose items failed to write. Bounded retries; an
    /// order that survives them is an orphan and raises an alarm.
    async fn compensate(&self, order_id: Uuid) {
        let attempts = self.config.compensation_attempts.max(1);

        for attempt in 1..=attempts {
            match self.order_repo.delete_order(order_id).await {
                Ok(()) => {
                    tracing::info!("Rolled back order {} after failed item write", order_id);
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        "Compensating delete of order {} failed (attempt {}/{}): {}",
                        order_id,
                        attempt,
                        attempts,
                        e
                    );
                    if attempt < attempts {
                        let backoff = self.config.compensation_backoff_ms * attempt as u64;
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                    }
                }
            }
        }

        tracing::error!(
            "ALARM: order {} has no items and could not be deleted; manual cleanup required",
            order_id
        );
        let detail = format!("compensating delete failed after {} attempts", attempts);
        if let Err(e) = self
            .audit_log
            .record(AuditKind::OrphanOrder, &order_id.to_string(), &detail)
            .await
        {
            tracing::error!("Failed to audit orphan order {}: {}", order_id, e);
        }
    }
}

fn validate(request: &CreateOrderRequest) -> Result<()> {
    if request.buyer.name.trim().is_empty() {
        return Err(AppError::Validation("Buyer name is required".to_string()));
    }
    if request.total_price_cents <= 0 {
        return Err(AppError::Validation("Order total must be positive".to_string()));
    }
    if request.items.is_empty() {
        return Err(AppError::Validation("Order must contain at least one item".to_string()));
    }
    for (index, item) in request.items.iter().enumerate() {
        if item.quantity <= 0 {
            return Err(AppError::Validation(format!(
                "Item {} quantity must be positive",
                index
            )));
        }
        if item.price_at_purchase_cents < 0 {
            return Err(AppError::Validation(format!(
                "Item {} price cannot be negative",
                index
            )));
        }
    }
    Ok(())
}

/// An earlier order already holds this gateway payment id. Same purchase
/// is an idempotent retry; anything else is a conflict.
fn replay(existing: Order, store: Store, request: &CreateOrderRequest) -> Result<RecordedOrder> {
    if existing.items.is_empty() {
        return Err(AppError::Conflict(format!(
            "Payment {} is still being recorded by another request",
            existing.gateway_payment_id.as_deref().unwrap_or_default()
        )));
    }

    if !existing.matches_request(request) {
        tracing::warn!(
            "Gateway payment {} reused with different order content (existing order {})",
            existing.gateway_payment_id.as_deref().unwrap_or_default(),
            existing.id
        );
        return Err(AppError::Conflict(
            "Payment is already recorded against a different order".to_string(),
        ));
    }

    tracing::info!("Returning existing order {} for replayed payment", existing.id);
    Ok(RecordedOrder {
        order: existing,
        store,
        created: false,
    })
}
