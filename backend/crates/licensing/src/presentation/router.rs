//! Licensing Router

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;

use crate::application::admin_auth::AdminAuthenticator;
use crate::application::config::LicensingConfig;
use crate::domain::repository::LicenseRepository;
use crate::infra::postgres::PgLicenseRepository;
use crate::infra::sqlite::SqliteLicenseRepository;
use crate::presentation::handlers::{self, LicenseAppState};
use crate::presentation::middleware::{
    AdminGateState, LimiterPools, OpClass, RateLimitState, rate_limit, require_admin_key,
};

/// Create the licensing router with the PostgreSQL repository
pub fn licensing_router(repo: PgLicenseRepository, config: LicensingConfig) -> Router {
    let config = Arc::new(config);
    let authenticator = Arc::new(AdminAuthenticator::new(config.clone()));
    licensing_router_with(repo, config, authenticator, Arc::new(LimiterPools::new()))
}

/// Create the licensing router with the SQLite repository
pub fn licensing_router_sqlite(repo: SqliteLicenseRepository, config: LicensingConfig) -> Router {
    let config = Arc::new(config);
    let authenticator = Arc::new(AdminAuthenticator::new(config.clone()));
    licensing_router_with(repo, config, authenticator, Arc::new(LimiterPools::new()))
}

/// Create a licensing router for any repository, with shared protective state
///
/// `authenticator` and `pools` are per-process singletons; the composition
/// root may share them with routes outside this router (e.g. a
/// default-pool health check).
pub fn licensing_router_with<R>(
    repo: R,
    config: Arc<LicensingConfig>,
    authenticator: Arc<AdminAuthenticator>,
    pools: Arc<LimiterPools>,
) -> Router
where
    R: LicenseRepository + Clone + Send + Sync + 'static,
{
    let state = LicenseAppState {
        repo: Arc::new(repo),
        config,
    };

    let admin_rate = RateLimitState {
        pools: pools.clone(),
        class: OpClass::Admin,
        authenticator: authenticator.clone(),
    };
    let fast_rate = RateLimitState {
        pools,
        class: OpClass::Fast,
        authenticator: authenticator.clone(),
    };
    let gate = AdminGateState { authenticator };

    // the rate limiter is layered last so it runs first; its admin-key
    // verdict rides the request extensions into the gate
    let admin_routes = Router::new()
        .route("/", get(handlers::list::<R>))
        .route("/issue", post(handlers::issue::<R>))
        .route("/revoke", post(handlers::revoke::<R>))
        .route("/update", post(handlers::update::<R>))
        .route_layer(from_fn_with_state(gate, require_admin_key))
        .route_layer(from_fn_with_state(admin_rate, rate_limit));

    let client_routes = Router::new()
        .route("/validate", post(handlers::validate::<R>))
        .route("/heartbeat", post(handlers::heartbeat::<R>))
        .route_layer(from_fn_with_state(fast_rate, rate_limit));

    admin_routes.merge(client_routes).with_state(state)
}
