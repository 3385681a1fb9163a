use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub owner_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStoreRequest {
    pub seller_id: Uuid,
    pub name: String,
    pub owner_email: Option<String>,
}
