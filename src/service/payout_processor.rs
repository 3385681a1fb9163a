use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, PayoutBlockReason, Result},
    integrations::{EventPublisher, IntegrationEvent},
    repository::{BankDetailRepository, PayoutRepository, StoreRepository},
};

pub struct PayoutProcessor {
    payout_repo: Arc<dyn PayoutRepository>,
    bank_detail_repo: Arc<dyn BankDetailRepository>,
    store_repo: Arc<dyn StoreRepository>,
    events: EventPublisher,
}

impl PayoutProcessor {
    pub fn new(
        payout_repo: Arc<dyn PayoutRepository>,
        bank_detail_repo: Arc<dyn BankDetailRepository>,
        store_repo: Arc<dyn StoreRepository>,
        events: EventPublisher,
    ) -> Self {
        Self {
            payout_repo,
            bank_detail_repo,
            store_repo,
            events,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<PayoutRequest> {
        self.payout_repo.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Payout request not found".to_string()))
    }

    pub async fn get_with_destination(&self, id: Uuid) -> Result<PayoutWithDestination> {
        let payout = self.get(id).await?;
        let bank_detail = self.bank_detail_repo.find_by_seller(payout.seller_id).await?;
        Ok(PayoutWithDestination { payout, bank_detail })
    }

    pub async fn list(&self, status: Option<PayoutStatus>, limit: i64, offset: i64) -> Result<Vec<PayoutRequest>> {
        self.payout_repo.list(status, limit, offset).await
    }

    /// pending -> paid. Blocked without mutation when the request is not
    /// pending or the seller has no payout destination.
    pub async fn mark_paid(
        &self,
        id: Uuid,
        proof_url: Option<String>,
        notes: Option<String>,
        paid_by: &str,
    ) -> Result<PayoutRequest> {
        let payout = self.get(id).await?;
        ensure_pending(&payout)?;

        let bank_detail = self.bank_detail_repo.find_by_seller(payout.seller_id).await?
            .ok_or(AppError::PayoutBlocked(PayoutBlockReason::MissingPayoutDestination))?;

        let settlement = PayoutSettlement {
            proof_url,
            notes,
            paid_by: paid_by.to_string(),
            paid_at: Utc::now(),
        };

        if !self.payout_repo.mark_paid(id, &settlement).await? {
            return Err(self.lost_transition(id).await);
        }

        let updated = self.get(id).await?;
        let destination = bank_detail.masked_destination();
        tracing::info!(
            "Payout {} of {} marked paid by {} via {}",
            id,
            format_cents(updated.final_amount_cents),
            paid_by,
            destination
        );

        self.events.publish(IntegrationEvent::PayoutPaid {
            payout: updated.clone(),
            recipient_email: self.recipient_for(&updated).await,
            destination,
        });

        Ok(updated)
    }

    /// pending -> rejected. The request's orders stay claimed.
    pub async fn reject(&self, id: Uuid, notes: Option<String>, rejected_by: &str) -> Result<PayoutRequest> {
        let payout = self.get(id).await?;
        ensure_pending(&payout)?;

        if !self.payout_repo.mark_rejected(id, notes, Utc::now()).await? {
            return Err(self.lost_transition(id).await);
        }

        let updated = self.get(id).await?;
        tracing::info!("Payout {} rejected by {}", id, rejected_by);

        self.events.publish(IntegrationEvent::PayoutRejected {
            payout: updated.clone(),
            recipient_email: self.recipient_for(&updated).await,
        });

        Ok(updated)
    }

    /// The conditional update matched nothing: someone else moved it first.
    async fn lost_transition(&self, id: Uuid) -> AppError {
        match self.payout_repo.find_by_id(id).await {
            Ok(Some(current)) => {
                AppError::PayoutBlocked(PayoutBlockReason::NotPending { status: current.status })
            }
            Ok(None) => AppError::NotFound("Payout request not found".to_string()),
            Err(e) => e,
        }
    }

    async fn recipient_for(&self, payout: &PayoutRequest) -> Option<String> {
        match self.store_repo.find_by_id(payout.store_id).await {
            Ok(store) => store.and_then(|s| s.owner_email),
            Err(e) => {
                tracing::warn!("Could not look up store {} for payout notice: {}", payout.store_id, e);
                None
            }
        }
    }
}

fn ensure_pending(payout: &PayoutRequest) -> Result<()> {
    if payout.status != PayoutStatus::Pending {
        return Err(AppError::PayoutBlocked(PayoutBlockReason::NotPending {
            status: payout.status,
        }));
    }
    Ok(())
}
