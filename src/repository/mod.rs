use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::config::EligibilityAnchor;
use crate::domain::*;
use crate::error::Result;

pub mod audit_repository;
pub mod bank_detail_repository;
pub mod order_repository;
pub mod payout_repository;
pub mod referral_repository;
pub mod store_repository;

pub use audit_repository::SqliteAuditLogRepository;
pub use bank_detail_repository::SqliteBankDetailRepository;
pub use order_repository::SqliteOrderRepository;
pub use payout_repository::SqlitePayoutRepository;
pub use referral_repository::SqliteReferralRepository;
pub use store_repository::SqliteStoreRepository;

#[async_trait]
pub trait StoreRepository: Send + Sync {
    async fn create(&self, store: CreateStoreRequest) -> Result<Store>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Store>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts the order row alone. A reused gateway payment id surfaces as
    /// `AppError::Conflict`.
    async fn insert_order(&self, order: &Order) -> Result<()>;
    /// Inserts every item in one transaction; on error none are persisted.
    async fn insert_items(&self, order_id: Uuid, items: &[OrderItem]) -> Result<()>;
    /// Removes an order and anything referencing it. Only used to compensate
    /// a failed item write.
    async fn delete_order(&self, id: Uuid) -> Result<()>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>>;
    async fn find_by_gateway_payment_id(&self, gateway_payment_id: &str) -> Result<Option<Order>>;
    /// Compare-and-set on status. Returns false when the order was not in `from`.
    async fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<bool>;
    /// Marks a pending COD payment as paid. Returns false if nothing changed.
    async fn settle_cod_payment(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;
    /// Delivered orders anchored at or before `cutoff` that no payout has claimed.
    async fn list_eligible_for_payout(
        &self,
        cutoff: DateTime<Utc>,
        anchor: EligibilityAnchor,
    ) -> Result<Vec<EligibleOrder>>;
}

#[async_trait]
pub trait PayoutRepository: Send + Sync {
    /// Writes the request and claims its orders atomically. An order that is
    /// already claimed fails the whole batch with `AppError::Conflict`.
    async fn create_batch(&self, batch: NewPayoutRequest) -> Result<PayoutRequest>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PayoutRequest>>;
    async fn list(&self, status: Option<PayoutStatus>, limit: i64, offset: i64) -> Result<Vec<PayoutRequest>>;
    /// pending -> paid. Returns false when the request was not pending.
    async fn mark_paid(&self, id: Uuid, settlement: &PayoutSettlement) -> Result<bool>;
    /// pending -> rejected. Returns false when the request was not pending.
    async fn mark_rejected(
        &self,
        id: Uuid,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<bool>;
}

#[async_trait]
pub trait BankDetailRepository: Send + Sync {
    async fn upsert(&self, detail: UpsertBankDetail) -> Result<BankDetail>;
    async fn find_by_seller(&self, seller_id: Uuid) -> Result<Option<BankDetail>>;
}

#[async_trait]
pub trait ReferralRepository: Send + Sync {
    async fn create_session(&self, store_id: Uuid, source: Option<String>) -> Result<ReferralSession>;
    async fn find_session(&self, id: &str) -> Result<Option<ReferralSession>>;
    /// Links an unconverted session of the same store to `order_id`.
    /// Returns false when there was no open session to link.
    async fn attribute(
        &self,
        session_id: &str,
        store_id: Uuid,
        order_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool>;
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn record(&self, kind: AuditKind, subject_id: &str, detail: &str) -> Result<()>;
    async fn list_recent(&self, limit: i64) -> Result<Vec<AuditEntry>>;
}
