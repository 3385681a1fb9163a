use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::BankDetail;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub id: Uuid,
    pub seller_id: Uuid,
    /// Lowest-id store among the batched orders; the batch covers all of
    /// the seller's stores.
    pub store_id: Uuid,
    pub total_earned_cents: i64,
    pub platform_fee_cents: i64,
    pub final_amount_cents: i64,
    pub order_ids: Vec<Uuid>,
    pub status: PayoutStatus,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_by: Option<String>,
    pub admin_notes: Option<String>,
    pub proof_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Approved,
    Paid,
    Rejected,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Approved => "approved",
            PayoutStatus::Paid => "paid",
            PayoutStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PayoutStatus::Pending),
            "approved" => Some(PayoutStatus::Approved),
            "paid" => Some(PayoutStatus::Paid),
            "rejected" => Some(PayoutStatus::Rejected),
            _ => None,
        }
    }
}

/// A batch computed by the generator, not yet persisted.
#[derive(Debug, Clone)]
pub struct NewPayoutRequest {
    pub seller_id: Uuid,
    pub store_id: Uuid,
    pub total_earned_cents: i64,
    pub platform_fee_cents: i64,
    pub final_amount_cents: i64,
    pub order_ids: Vec<Uuid>,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
}

impl NewPayoutRequest {
    pub fn compute(
        seller_id: Uuid,
        store_id: Uuid,
        order_ids: Vec<Uuid>,
        total_earned_cents: i64,
        fee_bps: i64,
        today: NaiveDate,
    ) -> Self {
        let platform_fee_cents = platform_fee_cents(total_earned_cents, fee_bps);
        let (week_start_date, week_end_date) = calendar_week(today);
        Self {
            seller_id,
            store_id,
            total_earned_cents,
            platform_fee_cents,
            final_amount_cents: total_earned_cents - platform_fee_cents,
            order_ids,
            week_start_date,
            week_end_date,
        }
    }
}

/// A delivered order past its eligibility window and not yet claimed.
#[derive(Debug, Clone)]
pub struct EligibleOrder {
    pub order_id: Uuid,
    pub store_id: Uuid,
    pub seller_id: Uuid,
    pub total_price_cents: i64,
}

/// Admin input for settling a payout.
#[derive(Debug, Clone)]
pub struct PayoutSettlement {
    pub proof_url: Option<String>,
    pub notes: Option<String>,
    pub paid_by: String,
    pub paid_at: DateTime<Utc>,
}

/// Payout plus the seller's destination, for admin review.
#[derive(Debug, Clone, Serialize)]
pub struct PayoutWithDestination {
    pub payout: PayoutRequest,
    pub bank_detail: Option<BankDetail>,
}

/// Fee in minor units, rounded half-up to the nearest cent.
/// `fee_bps` is in basis points (390 = 3.9%).
pub fn platform_fee_cents(total_earned_cents: i64, fee_bps: i64) -> i64 {
    let scaled = total_earned_cents as i128 * fee_bps as i128;
    let fee = if scaled >= 0 {
        (scaled + 5_000) / 10_000
    } else {
        (scaled - 5_000) / 10_000
    };
    fee as i64
}

/// Monday..Sunday of the week containing `day`.
pub fn calendar_week(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = day - Duration::days(day.weekday().num_days_from_monday() as i64);
    (start, start + Duration::days(6))
}
