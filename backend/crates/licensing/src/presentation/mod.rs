//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and protective middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::LicenseAppState;
pub use middleware::{
    AdminAuthStatus, AdminGateState, LimiterPools, OpClass, RateLimitState, rate_limit,
    require_admin_key,
};
pub use router::{licensing_router, licensing_router_sqlite, licensing_router_with};
