use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::service::payout_generator::PayoutGenerator;

/// Runs the payout generator on a fixed interval. The handle is never
/// expected to complete.
pub fn start_payout_worker(generator: Arc<PayoutGenerator>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        tracing::info!("Payout worker started, running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            tracing::debug!("Running scheduled payout generation");
            match generator.run().await {
                Ok(report) => {
                    tracing::info!(
                        "Payout run finished: {} created, {} failed",
                        report.created.len(),
                        report.failed.len()
                    );
                    for failure in &report.failed {
                        tracing::warn!(
                            "Seller {} (store {}) not paid out: {}",
                            failure.seller_id,
                            failure.store_id,
                            failure.message
                        );
                    }
                }
                Err(e) => {
                    tracing::error!("Scheduled payout run failed: {}", e);
                }
            }
        }
    })
}
