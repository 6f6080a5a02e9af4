//! # Brightline Shared Library
//!
//! Domain types, persistence and the intake pipeline behind the Brightline
//! marketing site API.
//!
//! ## Module Organization
//!
//! - `db`: SQLite pool and embedded migrations
//! - `models`: Database models and their CRUD operations
//! - `auth`: Password hashing, JWT tokens and role permissions
//! - `validation`: Field validation helpers and the field error map
//! - `security`: CAPTCHA verification, input screening and client IP resolution
//! - `integrations`: Email, CRM and object storage collaborators
//! - `intake`: Form submission and file upload pipeline

pub mod auth;
pub mod db;
pub mod intake;
pub mod integrations;
pub mod models;
pub mod security;
pub mod validation;

/// Current version of the Brightline shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
