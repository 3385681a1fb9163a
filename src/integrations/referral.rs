use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::Result,
    integrations::{Integration, IntegrationEvent},
    repository::ReferralRepository,
};

/// Links a checkout to the referral session that brought the buyer in.
pub struct ReferralIntegration {
    referral_repo: Arc<dyn ReferralRepository>,
}

impl ReferralIntegration {
    pub fn new(referral_repo: Arc<dyn ReferralRepository>) -> Self {
        Self { referral_repo }
    }
}

#[async_trait]
impl Integration for ReferralIntegration {
    fn name(&self) -> &str {
        "Referral"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn handle_event(&self, event: &IntegrationEvent) -> Result<()> {
        let IntegrationEvent::OrderCreated { order, referral_session_id: Some(session_id), .. } = event else {
            return Ok(());
        };

        let attributed = self
            .referral_repo
            .attribute(session_id, order.store_id, order.id, Utc::now())
            .await?;

        if attributed {
            tracing::info!("Attributed order {} to referral session {}", order.id, session_id);
        } else {
            tracing::debug!(
                "No open referral session {} for store {}; order {} left unattributed",
                session_id,
                order.store_id,
                order.id
            );
        }

        Ok(())
    }
}
