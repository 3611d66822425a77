//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request-level errors flow through
//! `licensing::LicenseError` and the unified `kernel` error types.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Json, Router, middleware::from_fn_with_state, routing::get};
use licensing::application::admin_auth::AdminAuthenticator;
use licensing::middleware::{LimiterPools, OpClass, RateLimitState, rate_limit};
use licensing::router::licensing_router_with;
use licensing::{LicensingConfig, PgLicenseRepository, SqliteLicenseRepository};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound for JSON request bodies (64 KiB)
const MAX_JSON_BODY: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,licensing=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Signing keys: absent or unparseable keys abort startup
    let private_key_pem = env::var("SIGNING_PRIVATE_KEY_PEM")
        .map_err(|_| anyhow::anyhow!("SIGNING_PRIVATE_KEY_PEM must be set"))?;
    let public_key_pem = env::var("SIGNING_PUBLIC_KEY_PEM")
        .map_err(|_| anyhow::anyhow!("SIGNING_PUBLIC_KEY_PEM must be set"))?;

    let admin_api_key = env::var("ADMIN_API_KEY").ok().filter(|k| !k.is_empty());
    let admin_api_key_hashes = env::var("ADMIN_API_KEY_HASHES")
        .map(|raw| LicensingConfig::split_hash_list(&raw))
        .unwrap_or_default();

    if admin_api_key.is_none() && admin_api_key_hashes.is_empty() {
        tracing::warn!("No admin credentials configured; all admin operations will be rejected");
    }

    let config = Arc::new(LicensingConfig::new(
        admin_api_key,
        admin_api_key_hashes,
        &private_key_pem,
        &public_key_pem,
    )?);

    // Protective state: one instance of each per process
    let authenticator = Arc::new(AdminAuthenticator::new(config.clone()));
    let pools = Arc::new(LimiterPools::new());

    // Database connection; the composition root picks the adapter,
    // nothing below it branches on the driver
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    let licenses = if database_url.starts_with("sqlite:") {
        let options = database_url
            .parse::<SqliteConnectOptions>()?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let repo = SqliteLicenseRepository::new(pool);
        repo.migrate().await?;
        tracing::info!("Connected to SQLite store");
        licensing_router_with(repo, config.clone(), authenticator.clone(), pools.clone())
    } else {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;
        let repo = PgLicenseRepository::new(pool);
        repo.migrate().await?;
        tracing::info!("Connected to PostgreSQL store");
        licensing_router_with(repo, config.clone(), authenticator.clone(), pools.clone())
    };

    // Health check rides the default limiter pool
    let default_rate = RateLimitState {
        pools,
        class: OpClass::Default,
        authenticator,
    };
    let health = Router::new()
        .route("/healthz", get(healthz))
        .route_layer(from_fn_with_state(default_rate, rate_limit));

    // Build router
    let app = Router::new()
        .nest("/api/v1/licenses", licenses)
        .merge(health)
        .layer(RequestBodyLimitLayer::new(MAX_JSON_BODY))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// GET /healthz
async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
