//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Canonical JSON signing and verification (ECDSA P-256/SHA-256)
//! - API key hash verification (Argon2id)
//! - Token-bucket rate limiting
//! - Authentication failure tracking
//! - Client identification helpers

pub mod client;
pub mod crypto;
pub mod failure;
pub mod password;
pub mod rate_limit;
pub mod signing;
