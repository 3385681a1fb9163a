use std::sync::Arc;

use crate::{
    config::{GatewayConfig, GatewayMode},
    domain::{OrderDraft, OrderPayment},
    error::{AppError, Result},
    integrations::{EventPublisher, IntegrationEvent},
    payments::PaymentConfirmation,
    service::ledger_service::{OrderLedger, RecordedOrder},
};

/// Entry point for both payment paths. Verification happens here; the
/// ledger only ever sees verified payments.
pub struct CheckoutService {
    ledger: Arc<OrderLedger>,
    events: EventPublisher,
    gateway: GatewayConfig,
}

impl CheckoutService {
    pub fn new(ledger: Arc<OrderLedger>, events: EventPublisher, gateway: GatewayConfig) -> Self {
        Self { ledger, events, gateway }
    }

    pub async fn checkout_cod(&self, draft: OrderDraft) -> Result<RecordedOrder> {
        let referral_session_id = draft.referral_session_id.clone();
        let recorded = self
            .ledger
            .create_order(draft.with_payment(OrderPayment::CashOnDelivery), self.gateway.mode)
            .await?;

        self.announce(&recorded, referral_session_id);
        Ok(recorded)
    }

    pub async fn checkout_online(
        &self,
        draft: OrderDraft,
        confirmation: PaymentConfirmation,
        mode: GatewayMode,
    ) -> Result<RecordedOrder> {
        let payment = confirmation.verify(self.gateway.key_secret(mode))?;
        let payment_id = payment.gateway_payment_id().to_string();
        let referral_session_id = draft.referral_session_id.clone();

        // Funds are captured at this point. Anything short of a replay
        // conflict must point the buyer at support with the payment id.
        let recorded = self
            .ledger
            .create_order(draft.with_payment(OrderPayment::Online(payment)), mode)
            .await
            .map_err(|e| match e {
                conflict @ AppError::Conflict(_) => conflict,
                AppError::LedgerFailure { message, .. } => AppError::LedgerFailure {
                    message,
                    gateway_payment_id: Some(payment_id.clone()),
                },
                other => {
                    tracing::error!(
                        "Verified payment {} could not be recorded: {}",
                        payment_id,
                        other
                    );
                    AppError::LedgerFailure {
                        message: other.to_string(),
                        gateway_payment_id: Some(payment_id.clone()),
                    }
                }
            })?;

        self.announce(&recorded, referral_session_id);
        Ok(recorded)
    }

    fn announce(&self, recorded: &RecordedOrder, referral_session_id: Option<String>) {
        if !recorded.created {
            return;
        }
        self.events.publish(IntegrationEvent::OrderCreated {
            order: recorded.order.clone(),
            store: recorded.store.clone(),
            referral_session_id,
        });
    }
}
