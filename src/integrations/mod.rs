use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, RwLock},
    task::JoinHandle,
};
use crate::domain::{AuditKind, Order, PayoutRequest, Store};
use crate::error::Result;
use crate::repository::AuditLogRepository;

pub mod email;
pub mod referral;

/// Settlement side effects handed to collaborators after the state change
/// that caused them has already been committed.
#[derive(Debug, Clone)]
pub enum IntegrationEvent {
    OrderCreated {
        order: Order,
        store: Store,
        referral_session_id: Option<String>,
    },
    PayoutPaid {
        payout: PayoutRequest,
        recipient_email: Option<String>,
        /// Masked payout destination, display only.
        destination: String,
    },
    PayoutRejected {
        payout: PayoutRequest,
        recipient_email: Option<String>,
    },
}

impl IntegrationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            IntegrationEvent::OrderCreated { .. } => "order_created",
            IntegrationEvent::PayoutPaid { .. } => "payout_paid",
            IntegrationEvent::PayoutRejected { .. } => "payout_rejected",
        }
    }

    /// Order or payout id the event is about.
    pub fn subject_id(&self) -> String {
        match self {
            IntegrationEvent::OrderCreated { order, .. } => order.id.to_string(),
            IntegrationEvent::PayoutPaid { payout, .. }
            | IntegrationEvent::PayoutRejected { payout, .. } => payout.id.to_string(),
        }
    }
}

#[async_trait]
pub trait Integration: Send + Sync {
    fn name(&self) -> &str;
    fn is_enabled(&self) -> bool;
    async fn handle_event(&self, event: &IntegrationEvent) -> Result<()>;
}

pub struct IntegrationManager {
    integrations: RwLock<Vec<Arc<dyn Integration>>>,
    audit_log: Arc<dyn AuditLogRepository>,
    timeout: Duration,
}

impl IntegrationManager {
    pub fn new(audit_log: Arc<dyn AuditLogRepository>, timeout: Duration) -> Self {
        Self {
            integrations: RwLock::new(Vec::new()),
            audit_log,
            timeout,
        }
    }

    pub async fn register(&self, integration: Arc<dyn Integration>) {
        if integration.is_enabled() {
            tracing::info!("Registered integration: {}", integration.name());
            self.integrations.write().await.push(integration);
        }
    }

    /// Runs every integration for `event`. Failures and timeouts are logged
    /// and audited; nothing is retried and nothing is returned to the caller.
    pub async fn handle_event(&self, event: IntegrationEvent) {
        let integrations = self.integrations.read().await;

        for integration in integrations.iter() {
            if !integration.is_enabled() {
                continue;
            }

            let outcome = tokio::time::timeout(self.timeout, integration.handle_event(&event)).await;
            let failure = match outcome {
                Ok(Ok(())) => {
                    tracing::debug!(
                        "Integration {} handled {} for {}",
                        integration.name(),
                        event.name(),
                        event.subject_id()
                    );
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("timed out after {}s", self.timeout.as_secs()),
            };

            tracing::error!(
                "Integration {} failed to handle {} for {}: {}",
                integration.name(),
                event.name(),
                event.subject_id(),
                failure
            );
            let detail = format!("{} {}: {}", integration.name(), event.name(), failure);
            if let Err(e) = self
                .audit_log
                .record(AuditKind::CollaboratorFailure, &event.subject_id(), &detail)
                .await
            {
                tracing::error!("Failed to write audit entry ({}): {}", detail, e);
            }
        }
    }
}

/// Non-blocking handle used by settlement code to enqueue side effects.
#[derive(Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<IntegrationEvent>,
    audit_log: Arc<dyn AuditLogRepository>,
}

impl EventPublisher {
    pub fn publish(&self, event: IntegrationEvent) {
        let (reason, event) = match self.tx.try_send(event) {
            Ok(()) => return,
            Err(mpsc::error::TrySendError::Full(event)) => ("queue full", event),
            Err(mpsc::error::TrySendError::Closed(event)) => ("queue closed", event),
        };

        let subject_id = event.subject_id();
        let detail = format!("dropped {} event: {}", event.name(), reason);
        tracing::warn!("{} for {}", detail, subject_id);

        let audit_log = self.audit_log.clone();
        tokio::spawn(async move {
            if let Err(e) = audit_log.record(AuditKind::EventDropped, &subject_id, &detail).await {
                tracing::error!("Failed to write audit entry ({}): {}", detail, e);
            }
        });
    }
}

pub fn event_channel(
    capacity: usize,
    audit_log: Arc<dyn AuditLogRepository>,
) -> (EventPublisher, mpsc::Receiver<IntegrationEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventPublisher { tx, audit_log }, rx)
}

/// Drains the outbound queue until every publisher is dropped.
pub fn start_event_worker(
    manager: Arc<IntegrationManager>,
    mut rx: mpsc::Receiver<IntegrationEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Outbound event worker started");
        while let Some(event) = rx.recv().await {
            manager.handle_event(event).await;
        }
        tracing::info!("Outbound event worker stopped");
    })
}
