mod common;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use settlement::{
    config::{EligibilityAnchor, GatewayMode, LedgerConfig},
    domain::{
        AuditKind, EligibleOrder, Order, OrderItem, OrderPayment, OrderStatus, PaymentMethod,
        PaymentStatus,
    },
    error::{AppError, Result},
    integrations::IntegrationEvent,
    payments::PaymentConfirmation,
    repository::{
        AuditLogRepository, OrderRepository, SqliteAuditLogRepository, SqliteOrderRepository,
        SqliteStoreRepository,
    },
    service::ledger_service::OrderLedger,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use common::*;

#[tokio::test]
async fn cod_checkout_records_pending_order() -> anyhow::Result<()> {
    let mut app = spawn_app().await?;
    let store = create_store(&app.pool, Some("owner@indigo.test")).await?;

    let recorded = app
        .context
        .checkout_service
        .checkout_cod(draft(store.id, 199_900, vec![item(1, 199_900)]))
        .await?;

    assert!(recorded.created);
    let order = recorded.order;
    assert_eq!(order.payment_method, PaymentMethod::Cod);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.paid_at.is_none());
    assert!(order.gateway_payment_id.is_none());

    let stored = app.context.order_repo.find_by_id(order.id).await?.expect("order persisted");
    assert_eq!(stored.total_price_cents, 199_900);
    assert_eq!(stored.items.len(), 1);

    match app.events.try_recv()? {
        IntegrationEvent::OrderCreated { order: event_order, .. } => assert_eq!(event_order.id, order.id),
        other => panic!("unexpected event {:?}", other.name()),
    }

    Ok(())
}

#[tokio::test]
async fn online_checkout_with_valid_signature_is_paid() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let store = create_store(&app.pool, None).await?;

    let recorded = app
        .context
        .checkout_service
        .checkout_online(
            draft(store.id, 499_800, vec![item(2, 249_900)]),
            signed_confirmation("order_Nb4x", "pay_Nb4x"),
            GatewayMode::Live,
        )
        .await?;

    let order = recorded.order;
    assert_eq!(order.payment_method, PaymentMethod::Online);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert!(order.paid_at.is_some());
    assert_eq!(order.gateway_order_id.as_deref(), Some("order_Nb4x"));
    assert_eq!(order.gateway_payment_id.as_deref(), Some("pay_Nb4x"));
    assert!(order.notes.is_none());

    Ok(())
}

#[tokio::test]
async fn tampered_signature_creates_no_order() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let store = create_store(&app.pool, None).await?;

    let mut confirmation = signed_confirmation("order_T1", "pay_T1");
    let flipped = if confirmation.signature.starts_with('a') { "b" } else { "a" };
    confirmation.signature.replace_range(0..1, flipped);

    let err = app
        .context
        .checkout_service
        .checkout_online(draft(store.id, 100_000, vec![item(1, 100_000)]), confirmation, GatewayMode::Live)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Security { .. }));
    assert_eq!(err.kind(), "security");
    assert!(app.context.order_repo.find_by_gateway_payment_id("pay_T1").await?.is_none());
    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM orders").await?, 0);

    Ok(())
}

#[tokio::test]
async fn missing_payment_field_is_validation_not_security() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let store = create_store(&app.pool, None).await?;

    let confirmation = PaymentConfirmation {
        gateway_order_id: "order_M1".to_string(),
        gateway_payment_id: String::new(),
        signature: "deadbeef".to_string(),
    };

    let err = app
        .context
        .checkout_service
        .checkout_online(draft(store.id, 100_000, vec![item(1, 100_000)]), confirmation, GatewayMode::Live)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn missing_gateway_secret_is_configuration_error() -> anyhow::Result<()> {
    let mut settings = test_settings();
    settings.gateway.live_key_secret = None;
    let app = spawn_app_with(settings).await?;
    let store = create_store(&app.pool, None).await?;

    let err = app
        .context
        .checkout_service
        .checkout_online(
            draft(store.id, 100_000, vec![item(1, 100_000)]),
            signed_confirmation("order_C1", "pay_C1"),
            GatewayMode::Live,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Configuration(_)));
    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM orders").await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_mode_uses_test_secret_and_marks_order() -> anyhow::Result<()> {
    let mut settings = test_settings();
    settings.gateway.test_key_secret = Some("gw_test_secret".to_string());
    let app = spawn_app_with(settings).await?;
    let store = create_store(&app.pool, None).await?;

    let confirmation = PaymentConfirmation {
        gateway_order_id: "order_test".to_string(),
        gateway_payment_id: "pay_test".to_string(),
        signature: settlement::payments::expected_signature("order_test", "pay_test", "gw_test_secret"),
    };

    let recorded = app
        .context
        .checkout_service
        .checkout_online(draft(store.id, 50_000, vec![item(1, 50_000)]), confirmation, GatewayMode::Test)
        .await?;

    assert!(recorded.order.notes.as_deref().unwrap_or_default().contains("Test order"));

    // A live-signed confirmation does not verify under the test secret.
    let err = app
        .context
        .checkout_service
        .checkout_online(
            draft(store.id, 50_000, vec![item(1, 50_000)]),
            signed_confirmation("order_live", "pay_live"),
            GatewayMode::Test,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Security { .. }));

    Ok(())
}

#[tokio::test]
async fn replayed_payment_returns_the_same_order() -> anyhow::Result<()> {
    let mut app = spawn_app().await?;
    let store = create_store(&app.pool, None).await?;
    let items = vec![item(1, 120_000), item(2, 40_000)];

    let first = app
        .context
        .checkout_service
        .checkout_online(
            draft(store.id, 200_000, items.clone()),
            signed_confirmation("order_R1", "pay_R1"),
            GatewayMode::Live,
        )
        .await?;
    let second = app
        .context
        .checkout_service
        .checkout_online(
            draft(store.id, 200_000, items),
            signed_confirmation("order_R1", "pay_R1"),
            GatewayMode::Live,
        )
        .await?;

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.order.id, second.order.id);
    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM orders").await?, 1);
    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM order_items").await?, 2);

    // Only the first checkout announces the order.
    assert!(app.events.try_recv().is_ok());
    assert!(app.events.try_recv().is_err());

    Ok(())
}

#[tokio::test]
async fn reused_payment_with_different_content_conflicts() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let store = create_store(&app.pool, None).await?;

    app.context
        .checkout_service
        .checkout_online(
            draft(store.id, 200_000, vec![item(1, 200_000)]),
            signed_confirmation("order_D1", "pay_D1"),
            GatewayMode::Live,
        )
        .await?;

    let err = app
        .context
        .checkout_service
        .checkout_online(
            draft(store.id, 350_000, vec![item(1, 350_000)]),
            signed_confirmation("order_D1", "pay_D1"),
            GatewayMode::Live,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM orders").await?, 1);
    Ok(())
}

#[tokio::test]
async fn rejects_unknown_store_and_bad_totals() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let store = create_store(&app.pool, None).await?;
    let checkout = &app.context.checkout_service;

    let err = checkout
        .checkout_cod(draft(Uuid::new_v4(), 10_000, vec![item(1, 10_000)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = checkout.checkout_cod(draft(store.id, 0, vec![item(1, 0)])).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = checkout.checkout_cod(draft(store.id, 10_000, vec![])).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM orders").await?, 0);
    Ok(())
}

#[tokio::test]
async fn verified_payment_for_unknown_store_names_the_payment() -> anyhow::Result<()> {
    let app = spawn_app().await?;

    let err = app
        .context
        .checkout_service
        .checkout_online(
            draft(Uuid::new_v4(), 60_000, vec![item(1, 60_000)]),
            signed_confirmation("order_X", "pay_X"),
            GatewayMode::Live,
        )
        .await
        .unwrap_err();

    match &err {
        AppError::LedgerFailure { gateway_payment_id, .. } => {
            assert_eq!(gateway_payment_id.as_deref(), Some("pay_X"))
        }
        other => panic!("expected ledger failure, got {:?}", other),
    }
    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM orders").await?, 0);
    Ok(())
}

/// Delegates to SQLite but fails every item write, and optionally every delete.
struct FailingItems {
    inner: SqliteOrderRepository,
    fail_delete: bool,
    attempted: Mutex<Option<Uuid>>,
}

#[async_trait]
impl OrderRepository for FailingItems {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        self.inner.insert_order(order).await
    }

    async fn insert_items(&self, order_id: Uuid, _items: &[OrderItem]) -> Result<()> {
        *self.attempted.lock().unwrap() = Some(order_id);
        Err(AppError::Database("disk I/O error".to_string()))
    }

    async fn delete_order(&self, id: Uuid) -> Result<()> {
        if self.fail_delete {
            return Err(AppError::Database("database is locked".to_string()));
        }
        self.inner.delete_order(id).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_gateway_payment_id(&self, gateway_payment_id: &str) -> Result<Option<Order>> {
        self.inner.find_by_gateway_payment_id(gateway_payment_id).await
    }

    async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus, at: DateTime<Utc>) -> Result<bool> {
        self.inner.update_status(id, from, to, at).await
    }

    async fn settle_cod_payment(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.inner.settle_cod_payment(id, at).await
    }

    async fn list_eligible_for_payout(&self, cutoff: DateTime<Utc>, anchor: EligibilityAnchor) -> Result<Vec<EligibleOrder>> {
        self.inner.list_eligible_for_payout(cutoff, anchor).await
    }
}

async fn failing_ledger(
    pool: &sqlx::SqlitePool,
    fail_delete: bool,
) -> (OrderLedger, Arc<FailingItems>, Arc<dyn AuditLogRepository>) {
    let orders = Arc::new(FailingItems {
        inner: SqliteOrderRepository::new(pool.clone()),
        fail_delete,
        attempted: Mutex::new(None),
    });
    let audit: Arc<dyn AuditLogRepository> = Arc::new(SqliteAuditLogRepository::new(pool.clone()));
    let ledger = OrderLedger::new(
        Arc::new(SqliteStoreRepository::new(pool.clone())),
        orders.clone(),
        audit.clone(),
        LedgerConfig {
            compensation_attempts: 2,
            compensation_backoff_ms: 1,
        },
    );
    (ledger, orders, audit)
}

#[tokio::test]
async fn failed_item_write_leaves_no_order_behind() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let store = create_store(&pool, None).await?;
    let (ledger, orders, _) = failing_ledger(&pool, false).await;

    let request = draft(store.id, 80_000, vec![item(1, 80_000)]).with_payment(OrderPayment::CashOnDelivery);
    let err = ledger.create_order(request, GatewayMode::Live).await.unwrap_err();

    assert!(matches!(err, AppError::LedgerFailure { .. }));
    let attempted = (*orders.attempted.lock().unwrap()).expect("item write attempted");
    assert!(orders.find_by_id(attempted).await?.is_none());
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM orders").await?, 0);

    Ok(())
}

#[tokio::test]
async fn online_ledger_failure_names_the_payment() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let store = create_store(&pool, None).await?;
    let (ledger, _, _) = failing_ledger(&pool, false).await;

    let payment = signed_confirmation("order_L1", "pay_L1").verify(Some(GATEWAY_SECRET))?;
    let request = draft(store.id, 80_000, vec![item(1, 80_000)]).with_payment(OrderPayment::Online(payment));
    let err = ledger.create_order(request, GatewayMode::Live).await.unwrap_err();

    match &err {
        AppError::LedgerFailure { gateway_payment_id, .. } => {
            assert_eq!(gateway_payment_id.as_deref(), Some("pay_L1"))
        }
        other => panic!("expected ledger failure, got {:?}", other),
    }
    assert!(SqliteOrderRepository::new(pool.clone())
        .find_by_gateway_payment_id("pay_L1")
        .await?
        .is_none());

    Ok(())
}

#[tokio::test]
async fn failed_compensation_raises_orphan_alarm() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let store = create_store(&pool, None).await?;
    let (ledger, orders, audit) = failing_ledger(&pool, true).await;

    let request = draft(store.id, 80_000, vec![item(1, 80_000)]).with_payment(OrderPayment::CashOnDelivery);
    let err = ledger.create_order(request, GatewayMode::Live).await.unwrap_err();
    assert!(matches!(err, AppError::LedgerFailure { .. }));

    let attempted = (*orders.attempted.lock().unwrap()).expect("item write attempted");
    let entries = audit.list_recent(10).await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, AuditKind::OrphanOrder);
    assert_eq!(entries[0].subject_id, attempted.to_string());

    Ok(())
}

#[tokio::test]
async fn order_lifecycle_and_cod_settlement() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let store = create_store(&app.pool, None).await?;
    let orders = &app.context.order_service;

    let order = app
        .context
        .checkout_service
        .checkout_cod(draft(store.id, 30_000, vec![item(1, 30_000)]))
        .await?
        .order;

    let err = orders.update_status(order.id, OrderStatus::Delivered).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    orders.update_status(order.id, OrderStatus::Confirmed).await?;
    orders.update_status(order.id, OrderStatus::Shipped).await?;
    let delivered = orders.update_status(order.id, OrderStatus::Delivered).await?;
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(delivered.delivered_at.is_some());

    let settled = orders.settle_cod_payment(order.id).await?;
    assert_eq!(settled.payment_status, PaymentStatus::Paid);
    assert!(settled.paid_at.is_some());

    let err = orders.settle_cod_payment(order.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    Ok(())
}
