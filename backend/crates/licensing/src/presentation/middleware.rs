//! Protective Middleware
//!
//! Rate limiting and admin authentication for the licensing surface. The
//! rate limiter runs before everything else and derives its key from the
//! presented credential; the admin-key check it performs for that
//! derivation is published into request extensions and reused by the admin
//! gate, so authentication runs once per request.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use platform::client::extract_client_ip;
use platform::rate_limit::{RateLimitConfig, TokenBucketLimiter};

use crate::application::admin_auth::AdminAuthenticator;
use crate::error::LicenseError;

/// Operation classes for limiter pool selection
///
/// Selection is by operation identity, not caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    /// High-frequency read-mostly operations (validate, heartbeat)
    Fast,
    /// Privileged mutating operations (issue, revoke, update, list)
    Admin,
    /// Everything else
    Default,
}

/// The three independently configured limiter pools
pub struct LimiterPools {
    fast: TokenBucketLimiter,
    admin: TokenBucketLimiter,
    default_pool: TokenBucketLimiter,
}

impl Default for LimiterPools {
    fn default() -> Self {
        Self::new()
    }
}

impl LimiterPools {
    /// The stock pool policy: 5 rps / burst 10 for client validation
    /// traffic, 1 rps / burst 3 for the admin surface, 2 rps / burst 5
    /// for everything else.
    pub fn new() -> Self {
        Self::with_configs(
            RateLimitConfig::new(5.0, 10),
            RateLimitConfig::new(1.0, 3),
            RateLimitConfig::new(2.0, 5),
        )
    }

    pub fn with_configs(
        fast: RateLimitConfig,
        admin: RateLimitConfig,
        default_pool: RateLimitConfig,
    ) -> Self {
        Self {
            fast: TokenBucketLimiter::new(fast),
            admin: TokenBucketLimiter::new(admin),
            default_pool: TokenBucketLimiter::new(default_pool),
        }
    }

    pub fn select(&self, class: OpClass) -> &TokenBucketLimiter {
        match class {
            OpClass::Fast => &self.fast,
            OpClass::Admin => &self.admin,
            OpClass::Default => &self.default_pool,
        }
    }
}

/// Admin-key verification outcome, published by the rate-limit middleware
#[derive(Debug, Clone, Copy)]
pub struct AdminAuthStatus {
    pub credential_ok: bool,
}

/// State for the rate-limit middleware
#[derive(Clone)]
pub struct RateLimitState {
    pub pools: Arc<LimiterPools>,
    pub class: OpClass,
    pub authenticator: Arc<AdminAuthenticator>,
}

/// Token-bucket admission ahead of everything else
///
/// A caller whose bearer credential authenticates is keyed per credential,
/// so two admins behind one proxy are not throttled together; everyone
/// else is keyed by client address.
pub async fn rate_limit(
    State(state): State<RateLimitState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let client_ip = client_ip_of(&req);
    let bearer = bearer_token(req.headers()).map(str::to_owned);
    let credential_ok = bearer
        .as_deref()
        .is_some_and(|token| state.authenticator.key_matches(token));

    let key = match (&bearer, client_ip) {
        (Some(token), _) if credential_ok => format!("admin:{token}"),
        (_, Some(ip)) => format!("ip:{ip}"),
        (_, None) => "ip:unknown".to_string(),
    };

    req.extensions_mut().insert(AdminAuthStatus { credential_ok });

    let decision = state.pools.select(state.class).allow(&key);
    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        tracing::debug!(%key, "Rate limit exceeded");
        LicenseError::RateLimited {
            retry_after: decision.retry_after,
        }
        .into_response()
    };

    response
        .headers_mut()
        .insert("ratelimit-remaining", HeaderValue::from(decision.remaining));
    response
}

/// State for the admin gate middleware
#[derive(Clone)]
pub struct AdminGateState {
    pub authenticator: Arc<AdminAuthenticator>,
}

/// Require a valid admin bearer key
///
/// Failures are tracked per client address and surface uniformly as 401.
pub async fn require_admin_key(
    State(state): State<AdminGateState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let tracking_key = client_ip_of(&req)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    // reuse the verdict computed during limiter-key derivation when present
    let credential_ok = match req.extensions().get::<AdminAuthStatus>() {
        Some(status) => status.credential_ok,
        None => bearer_token(req.headers())
            .is_some_and(|token| state.authenticator.key_matches(token)),
    };

    match state.authenticator.finish(credential_ok, &tracking_key) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

fn client_ip_of(req: &Request<Body>) -> Option<IpAddr> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    extract_client_ip(req.headers(), peer)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
}
