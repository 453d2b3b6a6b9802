//! # TaskNotes Shared Library
//!
//! Domain types, persistence and business logic used by the TaskNotes API
//! server.
//!
//! ## Module Organization
//!
//! - `models`: Row types and their sqlx queries
//! - `query`: Task filter predicates and calendar-week windows
//! - `store`: Storage traits with PostgreSQL and in-memory backends
//! - `service`: Task, note and account use-cases
//! - `auth`: Password hashing, JWT tokens and the request auth context
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod query;
pub mod service;
pub mod store;

/// Current version of the TaskNotes shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
