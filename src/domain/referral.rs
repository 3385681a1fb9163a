use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Anonymous visit from a referral link, converted at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralSession {
    pub id: String,
    pub store_id: Uuid,
    pub source: Option<String>,
    pub order_id: Option<Uuid>,
    pub converted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
