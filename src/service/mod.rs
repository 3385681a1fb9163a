pub mod checkout_service;
pub mod ledger_service;
pub mod order_service;
pub mod payout_generator;
pub mod payout_processor;
pub mod payout_scheduler;

use std::sync::Arc;
use crate::config::Settings;
use crate::integrations::EventPublisher;
use crate::repository::*;
use checkout_service::CheckoutService;
use ledger_service::OrderLedger;
use order_service::OrderService;
use payout_generator::PayoutGenerator;
use payout_processor::PayoutProcessor;

pub use ledger_service::RecordedOrder;
pub use payout_generator::{PayoutRunReport, SellerFailure};
pub use payout_scheduler::start_payout_worker;

pub struct ServiceContext {
    pub store_repo: Arc<dyn StoreRepository>,
    pub order_repo: Arc<dyn OrderRepository>,
    pub payout_repo: Arc<dyn PayoutRepository>,
    pub bank_detail_repo: Arc<dyn BankDetailRepository>,
    pub audit_log: Arc<dyn AuditLogRepository>,
    pub events: EventPublisher,
    pub checkout_service: Arc<CheckoutService>,
    pub order_service: Arc<OrderService>,
    pub payout_generator: Arc<PayoutGenerator>,
    pub payout_processor: Arc<PayoutProcessor>,
}

impl ServiceContext {
    pub fn new(
        store_repo: Arc<dyn StoreRepository>,
        order_repo: Arc<dyn OrderRepository>,
        payout_repo: Arc<dyn PayoutRepository>,
        bank_detail_repo: Arc<dyn BankDetailRepository>,
        audit_log: Arc<dyn AuditLogRepository>,
        events: EventPublisher,
        settings: &Settings,
    ) -> Self {
        let ledger = Arc::new(OrderLedger::new(
            store_repo.clone(),
            order_repo.clone(),
            audit_log.clone(),
            settings.ledger.clone(),
        ));
        let checkout_service = Arc::new(CheckoutService::new(
            ledger,
            events.clone(),
            settings.gateway.clone(),
        ));
        let order_service = Arc::new(OrderService::new(order_repo.clone()));
        let payout_generator = Arc::new(PayoutGenerator::new(
            order_repo.clone(),
            payout_repo.clone(),
            settings.payouts.clone(),
        ));
        let payout_processor = Arc::new(PayoutProcessor::new(
            payout_repo.clone(),
            bank_detail_repo.clone(),
            store_repo.clone(),
            events.clone(),
        ));

        Self {
            store_repo,
            order_repo,
            payout_repo,
            bank_detail_repo,
            audit_log,
            events,
            checkout_service,
            order_service,
            payout_generator,
            payout_processor,
        }
    }
}
