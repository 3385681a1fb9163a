use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    config::PayoutConfig,
    domain::*,
    error::{AppError, Result},
    repository::{OrderRepository, PayoutRepository},
};

#[derive(Debug, Clone, Serialize)]
pub struct SellerFailure {
    pub seller_id: Uuid,
    pub store_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PayoutRunReport {
    pub created: Vec<PayoutRequest>,
    pub failed: Vec<SellerFailure>,
}

/// Turns delivered, unclaimed orders past the eligibility window into one
/// pending payout per seller. Each seller is written in its own transaction
/// so one failing seller does not hold back the rest.
pub struct PayoutGenerator {
    order_repo: Arc<dyn OrderRepository>,
    payout_repo: Arc<dyn PayoutRepository>,
    config: PayoutConfig,
    running: Mutex<()>,
}

impl PayoutGenerator {
    pub fn new(
        order_repo: Arc<dyn OrderRepository>,
        payout_repo: Arc<dyn PayoutRepository>,
        config: PayoutConfig,
    ) -> Self {
        Self {
            order_repo,
            payout_repo,
            config,
            running: Mutex::new(()),
        }
    }

    pub async fn run(&self) -> Result<PayoutRunReport> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<PayoutRunReport> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| AppError::Conflict("A payout run is already in progress".to_string()))?;

        let cutoff = now - Duration::days(self.config.eligibility_days);
        let eligible = self
            .order_repo
            .list_eligible_for_payout(cutoff, self.config.eligibility_anchor)
            .await?;

        // One batch per seller, across every store they own.
        let mut groups: BTreeMap<Uuid, Vec<EligibleOrder>> = BTreeMap::new();
        for order in eligible {
            groups.entry(order.seller_id).or_default().push(order);
        }

        tracing::debug!("Payout run at {}: {} seller group(s) eligible", now, groups.len());

        let mut report = PayoutRunReport::default();
        for (seller_id, orders) in groups {
            let store_id = orders.iter().map(|o| o.store_id).min().unwrap_or_default();
            match self.settle_group(seller_id, store_id, orders, now).await {
                Ok(Some(payout)) => {
                    tracing::info!(
                        "Created payout {} for seller {}: {} orders, earned {}, fee {}, final {}",
                        payout.id,
                        seller_id,
                        payout.order_ids.len(),
                        format_cents(payout.total_earned_cents),
                        format_cents(payout.platform_fee_cents),
                        format_cents(payout.final_amount_cents)
                    );
                    report.created.push(payout);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Payout generation failed for seller {}: {}", seller_id, e);
                    report.failed.push(SellerFailure {
                        seller_id,
                        store_id,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    async fn settle_group(
        &self,
        seller_id: Uuid,
        store_id: Uuid,
        orders: Vec<EligibleOrder>,
        now: DateTime<Utc>,
    ) -> Result<Option<PayoutRequest>> {
        let total = orders
            .iter()
            .try_fold(0i64, |acc, o| acc.checked_add(o.total_price_cents))
            .ok_or_else(|| AppError::Internal("earnings total overflowed".to_string()))?;

        if total <= 0 {
            tracing::debug!("Skipping seller {}: nothing to pay out", seller_id);
            return Ok(None);
        }

        let order_ids = orders.into_iter().map(|o| o.order_id).collect();
        let batch = NewPayoutRequest::compute(
            seller_id,
            store_id,
            order_ids,
            total,
            self.config.platform_fee_bps,
            now.date_naive(),
        );

        let payout = self.payout_repo.create_batch(batch).await?;
        Ok(Some(payout))
    }
}
