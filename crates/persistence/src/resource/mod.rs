//! Generic resource protocol.
//!
//! A [`Resource`] describes how one entity type is read, written and keyed:
//! its statements, its query-parameter allow-list, how it validates itself
//! and how its owning tenant is found. The functions in [`executor`] drive
//! read/create/update/delete for any conforming type, so the control flow
//! (validation, tenancy, row-count checks, change log) is written once.

pub mod executor;
mod key;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use serde::Serialize;

use crate::backends::sqlite::SqliteTransaction;
use crate::error::{StorageResult, ValidationError};
use crate::query::{NamedParams, ParamColumns};
use crate::tenant::TenantId;

pub use key::{KeyReader, ResourceKey};

/// Builds a value from a result row.
pub trait FromRow: Sized {
    /// Scans one row.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// An entity type exposed through the CRUD framework.
pub trait Resource: FromRow + Serialize + Send + Sync + 'static {
    /// The typed key identifying one row.
    type Key: ResourceKey;

    /// Type name used in errors and the change log.
    const TYPE_NAME: &'static str;

    /// Column of the select statement holding the owning tenant, for
    /// tenant-scoped types. Reads are restricted to the user's visible
    /// tenants on this column.
    const TENANT_COLUMN: Option<&'static str> = None;

    /// Base `SELECT` without `WHERE`, `ORDER BY` or pagination.
    fn select_statement() -> &'static str;

    /// `INSERT ... RETURNING`, bound with [`bind_fields`](Self::bind_fields).
    fn insert_statement() -> &'static str;

    /// `UPDATE ... RETURNING`, bound with the fields and the key. `None`
    /// means the type cannot be updated.
    fn update_statement() -> Option<&'static str> {
        None
    }

    /// `DELETE`, bound with the key.
    fn delete_statement() -> &'static str;

    /// Query parameters accepted by reads.
    fn param_columns() -> ParamColumns;

    /// Returns the key, or `None` before the row exists.
    fn keys(&self) -> Option<Self::Key>;

    /// Sets the key fields.
    fn set_keys(&mut self, key: &Self::Key);

    /// Checks required and well-formed fields without touching the store.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Human-readable name recorded in the change log.
    fn audit_name(&self) -> String;

    /// Returns [`Self::TYPE_NAME`].
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    /// Binds the writable fields for the insert and update statements.
    fn bind_fields(&self) -> NamedParams;

    /// Copies server-assigned columns from a `RETURNING` row.
    fn scan_returning(&mut self, row: &Row<'_>) -> rusqlite::Result<()>;

    /// Resolves the rows this resource references, filling in derived
    /// fields, and returns the tenant the written row will belong to.
    ///
    /// A missing referenced row is a not-found fault. `None` means the row
    /// is untenanted.
    fn resolve_references(&mut self, _tx: &SqliteTransaction) -> StorageResult<Option<TenantId>> {
        Ok(None)
    }

    /// Returns the tenant owning the existing row addressed by `key`.
    fn existing_tenant(_key: &Self::Key, _tx: &SqliteTransaction) -> StorageResult<Option<TenantId>> {
        Ok(None)
    }

    /// Store-backed checks that only apply when replacing an existing row.
    fn check_update(&self, _key: &Self::Key, _tx: &SqliteTransaction) -> StorageResult<()> {
        Ok(())
    }
}

/// Reads an RFC 3339 timestamp column.
pub fn timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            let idx = row.as_ref().column_index(column).unwrap_or_default();
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        })
}
