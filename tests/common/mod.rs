#![allow(dead_code)]

use chrono::{DateTime, Utc};
use settlement::{
    config::Settings,
    domain::{
        BuyerDetails, CreateStoreRequest, NewOrderItem, Order, OrderDraft, OrderItem, OrderStatus,
        PaymentMethod, PaymentStatus, PayoutMethod, Store, UpsertBankDetail,
    },
    integrations::{event_channel, IntegrationEvent},
    payments::{expected_signature, PaymentConfirmation},
    repository::{
        AuditLogRepository, BankDetailRepository, OrderRepository, SqliteAuditLogRepository,
        SqliteBankDetailRepository, SqliteOrderRepository, SqlitePayoutRepository,
        SqliteStoreRepository, StoreRepository,
    },
    service::ServiceContext,
};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub const GATEWAY_SECRET: &str = "gw_live_secret_for_tests";
pub const ADMIN_KEY: &str = "admin-test-key";

pub struct TestApp {
    pub pool: SqlitePool,
    pub settings: Settings,
    pub context: Arc<ServiceContext>,
    pub events: mpsc::Receiver<IntegrationEvent>,
}

/// One shared in-memory connection, migrated.
pub async fn test_pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.gateway.live_key_secret = Some(GATEWAY_SECRET.to_string());
    settings.auth.admin_api_key = ADMIN_KEY.to_string();
    settings.ledger.compensation_backoff_ms = 1;
    settings
}

pub async fn spawn_app() -> anyhow::Result<TestApp> {
    spawn_app_with(test_settings()).await
}

pub async fn spawn_app_with(settings: Settings) -> anyhow::Result<TestApp> {
    let pool = test_pool().await?;
    let audit_log: Arc<dyn AuditLogRepository> = Arc::new(SqliteAuditLogRepository::new(pool.clone()));
    let (publisher, events) = event_channel(64, audit_log.clone());

    let context = Arc::new(ServiceContext::new(
        Arc::new(SqliteStoreRepository::new(pool.clone())),
        Arc::new(SqliteOrderRepository::new(pool.clone())),
        Arc::new(SqlitePayoutRepository::new(pool.clone())),
        Arc::new(SqliteBankDetailRepository::new(pool.clone())),
        audit_log,
        publisher,
        &settings,
    ));

    Ok(TestApp {
        pool,
        settings,
        context,
        events,
    })
}

pub async fn create_store(pool: &SqlitePool, owner_email: Option<&str>) -> anyhow::Result<Store> {
    let repo = SqliteStoreRepository::new(pool.clone());
    let store = repo
        .create(CreateStoreRequest {
            seller_id: Uuid::new_v4(),
            name: "Indigo Threads".to_string(),
            owner_email: owner_email.map(str::to_string),
        })
        .await?;
    Ok(store)
}

/// Opens another store for an existing seller.
pub async fn create_store_for(pool: &SqlitePool, seller_id: Uuid) -> anyhow::Result<Store> {
    let repo = SqliteStoreRepository::new(pool.clone());
    let store = repo
        .create(CreateStoreRequest {
            seller_id,
            name: "Indigo Home".to_string(),
            owner_email: None,
        })
        .await?;
    Ok(store)
}

pub async fn add_bank_details(pool: &SqlitePool, seller_id: Uuid) -> anyhow::Result<()> {
    let repo = SqliteBankDetailRepository::new(pool.clone());
    repo.upsert(UpsertBankDetail {
        seller_id,
        account_holder_name: "Kavya Rao".to_string(),
        bank_name: "HDFC".to_string(),
        account_number: "50100234567890".to_string(),
        routing_code: "HDFC0001234".to_string(),
        alias_id: None,
        payout_method: PayoutMethod::BankTransfer,
    })
    .await?;
    Ok(())
}

/// Writes a delivered order straight to storage, bypassing checkout.
pub async fn delivered_order(
    pool: &SqlitePool,
    store_id: Uuid,
    total_price_cents: i64,
    delivered_at: DateTime<Utc>,
) -> anyhow::Result<Uuid> {
    insert_order_with_status(pool, store_id, total_price_cents, OrderStatus::Delivered, Some(delivered_at)).await
}

pub async fn insert_order_with_status(
    pool: &SqlitePool,
    store_id: Uuid,
    total_price_cents: i64,
    status: OrderStatus,
    delivered_at: Option<DateTime<Utc>>,
) -> anyhow::Result<Uuid> {
    let repo = SqliteOrderRepository::new(pool.clone());
    let id = Uuid::new_v4();
    let at = delivered_at.unwrap_or_else(Utc::now);

    repo.insert_order(&Order {
        id,
        store_id,
        buyer_name: "Nikhil".to_string(),
        buyer_email: None,
        buyer_phone: None,
        buyer_address: None,
        total_price_cents,
        payment_method: PaymentMethod::Cod,
        payment_status: PaymentStatus::Paid,
        status,
        gateway_order_id: None,
        gateway_payment_id: None,
        gateway_signature: None,
        notes: None,
        paid_at: Some(at),
        delivered_at,
        created_at: at,
        updated_at: at,
        items: vec![],
    })
    .await?;

    repo.insert_items(id, &[OrderItem {
        id: Uuid::new_v4(),
        order_id: id,
        product_id: Uuid::new_v4(),
        product_name: "Block-print scarf".to_string(),
        product_image: None,
        quantity: 1,
        price_at_purchase_cents: total_price_cents,
    }])
    .await?;

    Ok(id)
}

pub fn item(quantity: i64, price_at_purchase_cents: i64) -> NewOrderItem {
    NewOrderItem {
        product_id: Uuid::new_v4(),
        product_name: "Brass lamp".to_string(),
        product_image: Some("https://cdn.example.com/lamp.jpg".to_string()),
        quantity,
        price_at_purchase_cents,
    }
}

pub fn draft(store_id: Uuid, total_price_cents: i64, items: Vec<NewOrderItem>) -> OrderDraft {
    OrderDraft {
        store_id,
        buyer: BuyerDetails {
            name: "Priya Sharma".to_string(),
            email: Some("priya@example.com".to_string()),
            phone: Some("+91 98765 43210".to_string()),
            address: Some("12 MG Road, Pune".to_string()),
        },
        total_price_cents,
        items,
        referral_session_id: None,
    }
}

pub fn signed_confirmation(gateway_order_id: &str, gateway_payment_id: &str) -> PaymentConfirmation {
    PaymentConfirmation {
        gateway_order_id: gateway_order_id.to_string(),
        gateway_payment_id: gateway_payment_id.to_string(),
        signature: expected_signature(gateway_order_id, gateway_payment_id, GATEWAY_SECRET),
    }
}

pub async fn count(pool: &SqlitePool, sql: &str) -> anyhow::Result<i64> {
    let (n,): (i64,) = sqlx::query_as(sql).fetch_one(pool).await?;
    Ok(n)
}
