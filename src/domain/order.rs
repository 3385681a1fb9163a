use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::payments::VerifiedPayment;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub store_id: Uuid,
    pub buyer_name: String,
    pub buyer_email: Option<String>,
    pub buyer_phone: Option<String>,
    pub buyer_address: Option<String>,
    pub total_price_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: Option<String>,
    pub quantity: i64,
    pub price_at_purchase_cents: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Online => "online",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cod" => Some(PaymentMethod::Cod),
            "online" => Some(PaymentMethod::Online),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Forward-only fulfilment lifecycle. Delivered and cancelled are terminal.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Shipped)
                | (Confirmed, Cancelled)
                | (Shipped, Delivered)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuyerDetails {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: Option<String>,
    pub quantity: i64,
    pub price_at_purchase_cents: i64,
}

/// How the checkout was paid. The online variant can only be built from a
/// confirmation that passed signature verification.
#[derive(Debug, Clone)]
pub enum OrderPayment {
    CashOnDelivery,
    Online(VerifiedPayment),
}

impl OrderPayment {
    pub fn method(&self) -> PaymentMethod {
        match self {
            OrderPayment::CashOnDelivery => PaymentMethod::Cod,
            OrderPayment::Online(_) => PaymentMethod::Online,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub store_id: Uuid,
    pub buyer: BuyerDetails,
    pub total_price_cents: i64,
    pub payment: OrderPayment,
    pub items: Vec<NewOrderItem>,
    pub referral_session_id: Option<String>,
}

/// Checkout input before the payment path is known.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub store_id: Uuid,
    pub buyer: BuyerDetails,
    pub total_price_cents: i64,
    pub items: Vec<NewOrderItem>,
    pub referral_session_id: Option<String>,
}

impl OrderDraft {
    pub fn with_payment(self, payment: OrderPayment) -> CreateOrderRequest {
        CreateOrderRequest {
            store_id: self.store_id,
            buyer: self.buyer,
            total_price_cents: self.total_price_cents,
            payment,
            items: self.items,
            referral_session_id: self.referral_session_id,
        }
    }
}

impl Order {
    /// True when `request` describes the same purchase this order recorded.
    /// Used to tell an idempotent retry from a conflicting reuse of a
    /// gateway payment id.
    pub fn matches_request(&self, request: &CreateOrderRequest) -> bool {
        if self.store_id != request.store_id
            || self.total_price_cents != request.total_price_cents
            || self.payment_method != request.payment.method()
            || self.items.len() != request.items.len()
        {
            return false;
        }

        if let OrderPayment::Online(payment) = &request.payment {
            if self.gateway_order_id.as_deref() != Some(payment.gateway_order_id()) {
                return false;
            }
        }

        let mut recorded: Vec<(Uuid, i64, i64)> = self
            .items
            .iter()
            .map(|i| (i.product_id, i.quantity, i.price_at_purchase_cents))
            .collect();
        let mut requested: Vec<(Uuid, i64, i64)> = request
            .items
            .iter()
            .map(|i| (i.product_id, i.quantity, i.price_at_purchase_cents))
            .collect();
        recorded.sort();
        requested.sort();
        recorded == requested
    }
}
