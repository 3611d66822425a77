//! Infrastructure Layer
//!
//! Database implementations of the license repository.

pub mod postgres;
pub mod sqlite;

pub use postgres::PgLicenseRepository;
pub use sqlite::SqliteLicenseRepository;
