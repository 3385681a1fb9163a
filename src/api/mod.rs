pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Buyer-facing checkout
        .nest("/api", api_routes())

        // Admin routes
        .nest("/admin", admin_routes(app_state.clone()))

        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/cod", post(handlers::checkout::checkout_cod))
        .route("/checkout/online", post(handlers::checkout::checkout_online))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/orders/:id", get(handlers::orders::get))
        .route("/orders/:id/status", post(handlers::orders::update_status))
        .route("/orders/:id/settle-cod", post(handlers::orders::settle_cod))
        .route("/payouts", get(handlers::payouts::list))
        .route("/payouts/generate", post(handlers::payouts::generate))
        .route("/payouts/:id", get(handlers::payouts::get))
        .route("/payouts/:id/mark-paid", post(handlers::payouts::mark_paid))
        .route("/payouts/:id/reject", post(handlers::payouts::reject))
        .route("/audit-log", get(handlers::audit::list))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_admin,
        ))
}
