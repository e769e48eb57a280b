//! SQLite backend implementation.
//!
//! Implements the storage traits on a pooled SQLite database, in memory
//! (for tests) or on disk.
//!
//! # Example
//!
//! ```no_run
//! use cdnops_persistence::backends::sqlite::SqliteBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! -- Tenant tree; id 1 is the seeded root tenant
//! CREATE TABLE tenant (
//!     id INTEGER PRIMARY KEY,
//!     name TEXT NOT NULL UNIQUE,
//!     active INTEGER NOT NULL,
//!     parent_id INTEGER REFERENCES tenant (id),
//!     last_updated TEXT NOT NULL
//! );
//!
//! -- Capability requirements, keyed by (delivery service, capability)
//! CREATE TABLE deliveryservice_required_capability (
//!     deliveryservice_id INTEGER NOT NULL REFERENCES deliveryservice (id),
//!     required_capability TEXT NOT NULL REFERENCES server_capability (name),
//!     last_updated TEXT NOT NULL,
//!     PRIMARY KEY (deliveryservice_id, required_capability)
//! );
//!
//! -- Federation to resolver associations
//! CREATE TABLE federation_federation_resolver (
//!     federation INTEGER NOT NULL REFERENCES federation (id),
//!     federation_resolver INTEGER NOT NULL REFERENCES federation_resolver (id),
//!     PRIMARY KEY (federation, federation_resolver)
//! );
//! ```

mod backend;
mod schema;
mod storage;
mod tenancy;
mod transaction;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use schema::SCHEMA_VERSION;
pub use transaction::{SqliteTransaction, TransactionMode};
