use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::OrderRepository,
};

pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: Uuid) -> Result<Order> {
        self.repo.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
    }

    pub async fn update_status(&self, id: Uuid, new_status: OrderStatus) -> Result<Order> {
        let order = self.get(id).await?;

        if !order.status.can_transition_to(new_status) {
            return Err(AppError::Validation(format!(
                "Cannot move order from {} to {}",
                order.status.as_str(),
                new_status.as_str()
            )));
        }

        let updated = self.repo.update_status(id, order.status, new_status, Utc::now()).await?;
        if !updated {
            return Err(AppError::Conflict(
                "Order status changed while the update was in flight".to_string(),
            ));
        }

        tracing::info!(
            "Order {} moved {} -> {}",
            id,
            order.status.as_str(),
            new_status.as_str()
        );
        self.get(id).await
    }

    /// Records cash collected for a COD order.
    pub async fn settle_cod_payment(&self, id: Uuid) -> Result<Order> {
        let order = self.get(id).await?;

        if order.payment_method != PaymentMethod::Cod {
            return Err(AppError::Validation(
                "Only cash-on-delivery orders are settled out-of-band".to_string(),
            ));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(AppError::Validation("Order is cancelled".to_string()));
        }
        if order.payment_status != PaymentStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Payment is already {}",
                order.payment_status.as_str()
            )));
        }

        if !self.repo.settle_cod_payment(id, Utc::now()).await? {
            return Err(AppError::Conflict("Payment was settled concurrently".to_string()));
        }

        tracing::info!("COD payment settled for order {}", id);
        self.get(id).await
    }
}
