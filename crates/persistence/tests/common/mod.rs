//! Test infrastructure for the persistence layer.
//!
//! Every test gets a fresh in-memory backend loaded with the fixture world
//! described in [`fixtures`].

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;

use cdnops_persistence::backends::sqlite::SqliteBackend;
use cdnops_persistence::query::QueryParams;
use cdnops_persistence::tenant::{CurrentUser, TenantId};

/// Creates an in-memory backend with the schema and fixtures loaded.
pub fn create_backend() -> SqliteBackend {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    load_fixtures(&backend);
    backend
}

/// Loads the fixture rows into `backend`.
pub fn load_fixtures(backend: &SqliteBackend) {
    backend.execute_batch(FIXTURES).expect("Failed to load fixtures");
}

/// A user belonging to `tenant`.
pub fn user(tenant: i64) -> CurrentUser {
    CurrentUser::new(format!("user-{tenant}"), TenantId::new(tenant))
}

/// A user belonging to the root tenant.
pub fn admin() -> CurrentUser {
    CurrentUser::new("admin", TenantId::new(ROOT))
}

/// Builds query parameters from pairs.
pub fn params(pairs: &[(&str, &str)]) -> QueryParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
