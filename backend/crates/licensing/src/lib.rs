//! Licensing Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - License entity, value objects, repository trait
//! - `application/` - Use cases and the admin authenticator
//! - `infra/` - Database implementations (PostgreSQL, SQLite)
//! - `presentation/` - HTTP handlers, DTOs, router, protective middleware
//!
//! ## Features
//! - Issue signed license files bound to a customer and machine
//! - Validate / heartbeat endpoints for deployed clients
//! - Revoke and partial-update of issued licenses
//! - Admin surface guarded by bearer-key auth, per-key rate limiting,
//!   and failure tracking with one-shot alerts
//!
//! ## Security Model
//! - License files carry an ECDSA P-256 signature over a canonical payload
//! - Admin keys verified against Argon2id hashes (or a constant-time
//!   comparison against a single configured plaintext key)
//! - Admin callers are rate limited per credential, everyone else per
//!   client address

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::LicensingConfig;
pub use error::{LicenseError, LicenseResult};
pub use infra::postgres::PgLicenseRepository;
pub use infra::sqlite::SqliteLicenseRepository;
pub use presentation::router::licensing_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
