use std::{sync::Arc, time::Duration};
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settlement::{
    api,
    config::{GatewayMode, Settings},
    integrations::{
        email::EmailIntegration, event_channel, referral::ReferralIntegration, start_event_worker,
        IntegrationManager,
    },
    repository::{
        AuditLogRepository, SqliteAuditLogRepository, SqliteBankDetailRepository,
        SqliteOrderRepository, SqlitePayoutRepository, SqliteReferralRepository,
        SqliteStoreRepository,
    },
    service::{start_payout_worker, ServiceContext},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "settlement=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!("Starting settlement server on {}:{}", settings.server.host, settings.server.port);

    match settings.gateway.mode {
        GatewayMode::Live => tracing::info!("Payment gateway in live mode"),
        GatewayMode::Test => tracing::warn!("Payment gateway in TEST mode; orders will be marked as test orders"),
    }
    if settings.gateway.key_secret(settings.gateway.mode).is_none() {
        tracing::warn!("No gateway key secret configured; online checkouts will be refused");
    }

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    // Initialize repositories
    let store_repo = Arc::new(SqliteStoreRepository::new(db_pool.clone()));
    let order_repo = Arc::new(SqliteOrderRepository::new(db_pool.clone()));
    let payout_repo = Arc::new(SqlitePayoutRepository::new(db_pool.clone()));
    let bank_detail_repo = Arc::new(SqliteBankDetailRepository::new(db_pool.clone()));
    let referral_repo = Arc::new(SqliteReferralRepository::new(db_pool.clone()));
    let audit_log: Arc<dyn AuditLogRepository> = Arc::new(SqliteAuditLogRepository::new(db_pool.clone()));

    // Outbound event queue and its collaborators
    let integration_manager = Arc::new(IntegrationManager::new(
        audit_log.clone(),
        Duration::from_secs(settings.notifications.timeout_secs),
    ));
    integration_manager
        .register(Arc::new(EmailIntegration::new(&settings.notifications)?))
        .await;
    integration_manager
        .register(Arc::new(ReferralIntegration::new(referral_repo)))
        .await;

    let (events, event_rx) = event_channel(settings.notifications.queue_capacity, audit_log.clone());
    let _event_worker = start_event_worker(integration_manager, event_rx);

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        store_repo,
        order_repo,
        payout_repo,
        bank_detail_repo,
        audit_log,
        events,
        &settings,
    ));

    if settings.payouts.enabled {
        let _payout_worker = start_payout_worker(
            service_context.payout_generator.clone(),
            Duration::from_secs(settings.payouts.interval_secs.max(1)),
        );
    } else {
        tracing::info!("Scheduled payout generation disabled");
    }

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
