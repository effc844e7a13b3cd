use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, require_api_key};
use crate::routes::{accounts, campaigns, health, transactions};
use crate::services::{AccountService, ActivityPublisher, CampaignService, TransactionService};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub transaction_service: TransactionService,
    pub campaign_service: CampaignService,
    pub account_service: AccountService,
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    let config = Arc::new(config);

    let publisher = ActivityPublisher::new(pool.clone());
    let state = AppState {
        transaction_service: TransactionService::new(
            pool.clone(),
            config.core.clone(),
            publisher.clone(),
        ),
        campaign_service: CampaignService::new(
            pool.clone(),
            config.core.clone(),
            publisher.clone(),
        ),
        account_service: AccountService::new(pool.clone(), config.core.clone(), publisher),
        pool,
        config: config.clone(),
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Protected routes (require the service API key)
    let protected_routes = Router::new()
        .route(
            "/loyalty/:retailer_slug/transactions",
            post(transactions::process_transaction),
        )
        .route(
            "/loyalty/:retailer_slug/campaigns/status_change",
            post(campaigns::change_campaign_status),
        )
        .route(
            "/loyalty/:retailer_slug/accounts/enrolment",
            post(accounts::enrol_account_holder),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    // Public probes and metrics
    let public_routes = Router::new()
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
