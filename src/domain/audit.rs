use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub kind: AuditKind,
    pub subject_id: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// A notification or referral collaborator failed or timed out.
    CollaboratorFailure,
    /// The outbound queue was full or closed when an event was published.
    EventDropped,
    /// A compensating delete failed and left an order without items.
    OrphanOrder,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::CollaboratorFailure => "collaborator_failure",
            AuditKind::EventDropped => "event_dropped",
            AuditKind::OrphanOrder => "orphan_order",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "collaborator_failure" => Some(AuditKind::CollaboratorFailure),
            "event_dropped" => Some(AuditKind::EventDropped),
            "orphan_order" => Some(AuditKind::OrphanOrder),
            _ => None,
        }
    }
}
