use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::collections::BTreeMap;

use crate::{
    config::NotificationConfig,
    domain::format_cents,
    error::{AppError, Result},
    integrations::{Integration, IntegrationEvent},
};

/// Fire-and-forget notification handed to the mail transport.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub event_type: &'static str,
    pub recipient_email: String,
    pub order_or_payout_id: String,
    pub templated_fields: BTreeMap<String, String>,
}

enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    LogOnly,
}

pub struct EmailIntegration {
    transport: Transport,
    from_address: String,
}

impl EmailIntegration {
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let transport = match &config.smtp {
            Some(smtp) => {
                let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
                    .map_err(|e| AppError::Internal(format!("Invalid SMTP relay {}: {}", smtp.host, e)))?
                    .port(smtp.port)
                    .credentials(Credentials::new(smtp.username.clone(), smtp.password.clone()))
                    .build();
                Transport::Smtp(transport)
            }
            None => {
                tracing::info!("SMTP not configured; notifications will be logged only");
                Transport::LogOnly
            }
        };

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    async fn deliver(&self, message: &NotificationMessage) -> Result<()> {
        let (subject, body) = render(message);

        let smtp = match &self.transport {
            Transport::Smtp(smtp) => smtp,
            Transport::LogOnly => {
                tracing::info!(
                    "Would send {} email to {} about {}: {}",
                    message.event_type,
                    message.recipient_email,
                    message.order_or_payout_id,
                    subject
                );
                return Ok(());
            }
        };

        let from: Mailbox = self
            .from_address
            .parse()
            .map_err(|e| AppError::External(format!("Invalid from address: {}", e)))?;
        let to: Mailbox = message
            .recipient_email
            .parse()
            .map_err(|e| AppError::External(format!("Invalid recipient address: {}", e)))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::External(format!("Failed to build email: {}", e)))?;

        smtp.send(email)
            .await
            .map_err(|e| AppError::External(format!("SMTP send failed: {}", e)))?;

        tracing::debug!("Sent {} email for {}", message.event_type, message.order_or_payout_id);
        Ok(())
    }
}

#[async_trait]
impl Integration for EmailIntegration {
    fn name(&self) -> &str {
        "Email"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn handle_event(&self, event: &IntegrationEvent) -> Result<()> {
        let mut first_error = None;
        for message in notifications_for(event) {
            // one bad recipient must not stop the others
            if let Err(e) = self.deliver(&message).await {
                tracing::warn!(
                    "Failed to send {} email for {}: {}",
                    message.event_type,
                    message.order_or_payout_id,
                    e
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Messages an event produces, one per known recipient.
pub fn notifications_for(event: &IntegrationEvent) -> Vec<NotificationMessage> {
    let mut messages = Vec::new();

    match event {
        IntegrationEvent::OrderCreated { order, store, .. } => {
            let mut fields = BTreeMap::new();
            fields.insert("order_id".to_string(), order.id.to_string());
            fields.insert("store_name".to_string(), store.name.clone());
            fields.insert("buyer_name".to_string(), order.buyer_name.clone());
            fields.insert("total".to_string(), format_cents(order.total_price_cents));
            fields.insert("item_count".to_string(), order.items.len().to_string());
            fields.insert("payment_method".to_string(), order.payment_method.as_str().to_string());
            fields.insert("payment_status".to_string(), order.payment_status.as_str().to_string());

            if let Some(buyer_email) = &order.buyer_email {
                messages.push(NotificationMessage {
                    event_type: "order_confirmation",
                    recipient_email: buyer_email.clone(),
                    order_or_payout_id: order.id.to_string(),
                    templated_fields: fields.clone(),
                });
            }
            if let Some(owner_email) = &store.owner_email {
                messages.push(NotificationMessage {
                    event_type: "new_order",
                    recipient_email: owner_email.clone(),
                    order_or_payout_id: order.id.to_string(),
                    templated_fields: fields,
                });
            }
        }
        IntegrationEvent::PayoutPaid { payout, recipient_email, destination } => {
            if let Some(recipient) = recipient_email {
                let mut fields = BTreeMap::new();
                fields.insert("payout_id".to_string(), payout.id.to_string());
                fields.insert("total_earned".to_string(), format_cents(payout.total_earned_cents));
                fields.insert("platform_fee".to_string(), format_cents(payout.platform_fee_cents));
                fields.insert("final_amount".to_string(), format_cents(payout.final_amount_cents));
                fields.insert("order_count".to_string(), payout.order_ids.len().to_string());
                fields.insert("week_start".to_string(), payout.week_start_date.to_string());
                fields.insert("week_end".to_string(), payout.week_end_date.to_string());
                fields.insert("destination".to_string(), destination.clone());
                if let Some(proof) = &payout.proof_url {
                    fields.insert("proof_url".to_string(), proof.clone());
                }
                messages.push(NotificationMessage {
                    event_type: "payout_paid",
                    recipient_email: recipient.clone(),
                    order_or_payout_id: payout.id.to_string(),
                    templated_fields: fields,
                });
            }
        }
        IntegrationEvent::PayoutRejected { payout, recipient_email } => {
            if let Some(recipient) = recipient_email {
                let mut fields = BTreeMap::new();
                fields.insert("payout_id".to_string(), payout.id.to_string());
                fields.insert("final_amount".to_string(), format_cents(payout.final_amount_cents));
                fields.insert(
                    "notes".to_string(),
                    payout.admin_notes.clone().unwrap_or_default(),
                );
                messages.push(NotificationMessage {
                    event_type: "payout_rejected",
                    recipient_email: recipient.clone(),
                    order_or_payout_id: payout.id.to_string(),
                    templated_fields: fields,
                });
            }
        }
    }

    messages
}

fn field<'a>(message: &'a NotificationMessage, key: &str) -> &'a str {
    message.templated_fields.get(key).map(String::as_str).unwrap_or("")
}

fn render(message: &NotificationMessage) -> (String, String) {
    match message.event_type {
        "order_confirmation" => (
            format!("Your order at {} is confirmed", field(message, "store_name")),
            format!(
                "Hi {},\n\nThanks for your order {}.\nTotal: {}\nPayment: {} ({})\n",
                field(message, "buyer_name"),
                field(message, "order_id"),
                field(message, "total"),
                field(message, "payment_method"),
                field(message, "payment_status"),
            ),
        ),
        "new_order" => (
            format!("New order {}", field(message, "order_id")),
            format!(
                "{} placed an order with {} item(s) totalling {} ({}).\n",
                field(message, "buyer_name"),
                field(message, "item_count"),
                field(message, "total"),
                field(message, "payment_method"),
            ),
        ),
        "payout_paid" => (
            format!("Payout of {} sent", field(message, "final_amount")),
            format!(
                "Your payout for {} to {} has been sent.\n\
                 Orders: {}\nEarned: {}\nPlatform fee: {}\nPaid out: {}\nDestination: {}\n",
                field(message, "week_start"),
                field(message, "week_end"),
                field(message, "order_count"),
                field(message, "total_earned"),
                field(message, "platform_fee"),
                field(message, "final_amount"),
                field(message, "destination"),
            ),
        ),
        _ => (
            "Payout request rejected".to_string(),
            format!(
                "Your payout request {} for {} was rejected.\nNotes: {}\n",
                field(message, "payout_id"),
                field(message, "final_amount"),
                field(message, "notes"),
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Order, OrderStatus, PaymentMethod, PaymentStatus, PayoutRequest, PayoutStatus, Store};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn store(owner_email: Option<&str>) -> Store {
        Store {
            id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            name: "Chai Corner".to_string(),
            owner_email: owner_email.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    fn order(store_id: Uuid, buyer_email: Option<&str>) -> Order {
        Order {
            id: Uuid::new_v4(),
            store_id,
            buyer_name: "Ravi".to_string(),
            buyer_email: buyer_email.map(str::to_string),
            buyer_phone: None,
            buyer_address: None,
            total_price_cents: 199_900,
            payment_method: PaymentMethod::Cod,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            gateway_order_id: None,
            gateway_payment_id: None,
            gateway_signature: None,
            notes: None,
            paid_at: None,
            delivered_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            items: vec![],
        }
    }

    #[test]
    fn order_created_notifies_buyer_and_seller() {
        let store = store(Some("owner@chai.test"));
        let order = order(store.id, Some("ravi@buyer.test"));
        let messages = notifications_for(&IntegrationEvent::OrderCreated {
            order,
            store,
            referral_session_id: None,
        });

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].event_type, "order_confirmation");
        assert_eq!(messages[0].recipient_email, "ravi@buyer.test");
        assert_eq!(messages[0].templated_fields["total"], "1999.00");
        assert_eq!(messages[1].event_type, "new_order");
    }

    #[test]
    fn missing_recipients_produce_no_messages() {
        let store = store(None);
        let order = order(store.id, None);
        let messages = notifications_for(&IntegrationEvent::OrderCreated {
            order,
            store,
            referral_session_id: None,
        });
        assert!(messages.is_empty());
    }

    #[test]
    fn payout_paid_carries_masked_destination_only() {
        let payout = PayoutRequest {
            id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            total_earned_cents: 1_000_000,
            platform_fee_cents: 39_000,
            final_amount_cents: 961_000,
            order_ids: vec![Uuid::new_v4()],
            status: PayoutStatus::Paid,
            week_start_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            week_end_date: NaiveDate::from_ymd_opt(2025, 3, 16).unwrap(),
            paid_at: Some(Utc::now()),
            paid_by: Some("admin-1".to_string()),
            admin_notes: None,
            proof_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let messages = notifications_for(&IntegrationEvent::PayoutPaid {
            payout,
            recipient_email: Some("seller@chai.test".to_string()),
            destination: "Bank transfer to HDFC ••••7890".to_string(),
        });

        assert_eq!(messages.len(), 1);
        let (subject, body) = render(&messages[0]);
        assert_eq!(subject, "Payout of 9610.00 sent");
        assert!(body.contains("••••7890"));
        assert!(body.contains("Platform fee: 390.00"));
    }
}
