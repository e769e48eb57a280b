//! Tenants as a resource.
//!
//! Tenants are themselves tenant-scoped: a user sees the tenants in their
//! own subtree, and creating or moving a tenant requires authorization on
//! the new parent.

use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::backends::sqlite::SqliteTransaction;
use crate::error::{ResourceError, StorageResult, ValidationDetail, ValidationError};
use crate::query::{NamedParams, ParamColumns, QueryParams, SqlParam, WhereColumn};
use crate::resource::{FromRow, KeyReader, Resource, ResourceKey, timestamp};
use crate::tenant::{ROOT_TENANT_NAME, TenantId};

/// A node of the tenant tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// Server-assigned id.
    #[serde(default)]
    pub id: Option<TenantId>,
    /// Unique tenant name.
    #[serde(default)]
    pub name: Option<String>,
    /// Inactive tenants authorize nothing.
    #[serde(default)]
    pub active: bool,
    /// Parent tenant; only the root tenant has none.
    #[serde(default)]
    pub parent_id: Option<TenantId>,
    /// Parent tenant name, filled in by the server.
    #[serde(default)]
    pub parent_name: Option<String>,
    /// When the row was last written.
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Tenant {
    /// Creates an active tenant below `parent_id`.
    pub fn new(name: impl Into<String>, parent_id: TenantId) -> Self {
        Self {
            name: Some(name.into()),
            active: true,
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }
}

/// Key of a [`Tenant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantKey(pub TenantId);

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id={}", self.0)
    }
}

impl ResourceKey for TenantKey {
    fn from_params(params: &QueryParams) -> Result<Self, ValidationError> {
        let mut reader = KeyReader::new(params);
        let id = reader.integer("id");
        reader.finish(id.map(|id| Self(TenantId::new(id))))
    }

    fn bind(&self) -> NamedParams {
        NamedParams::new().with("id", self.0.get())
    }
}

impl FromRow for Tenant {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            active: row.get("active")?,
            parent_id: row.get("parent_id")?,
            parent_name: row.get("parent_name")?,
            last_updated: Some(timestamp(row, "last_updated")?),
        })
    }
}

fn tenant_name(tx: &SqliteTransaction, id: TenantId) -> StorageResult<Option<String>> {
    tx.query_optional(
        "SELECT name FROM tenant WHERE id = :id",
        &NamedParams::new().with("id", id.get()),
        |row| row.get(0),
    )
}

impl Resource for Tenant {
    type Key = TenantKey;

    const TYPE_NAME: &'static str = "tenant";
    const TENANT_COLUMN: Option<&'static str> = Some("t.id");

    fn select_statement() -> &'static str {
        "SELECT t.id, t.name, t.active, t.parent_id, p.name AS parent_name, t.last_updated
FROM tenant t
LEFT JOIN tenant p ON p.id = t.parent_id"
    }

    fn insert_statement() -> &'static str {
        "INSERT INTO tenant (name, active, parent_id)
VALUES (:name, :active, :parent_id)
RETURNING id, last_updated"
    }

    fn update_statement() -> Option<&'static str> {
        Some(
            "UPDATE tenant
SET name = :name, active = :active, parent_id = :parent_id,
    last_updated = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
WHERE id = :id
RETURNING id, last_updated",
        )
    }

    fn delete_statement() -> &'static str {
        "DELETE FROM tenant WHERE id = :id"
    }

    fn param_columns() -> ParamColumns {
        ParamColumns::new()
            .column("id", WhereColumn::integer("t.id"))
            .column("name", WhereColumn::text("t.name"))
            .column("active", WhereColumn::boolean("t.active"))
            .column("parentId", WhereColumn::integer("t.parent_id"))
            .column("parentName", WhereColumn::text("p.name"))
    }

    fn keys(&self) -> Option<TenantKey> {
        self.id.map(TenantKey)
    }

    fn set_keys(&mut self, key: &TenantKey) {
        self.id = Some(key.0);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut details = Vec::new();
        match self.name.as_deref().map(str::trim) {
            None | Some("") => details.push(ValidationDetail::new("name", "cannot be blank")),
            Some(ROOT_TENANT_NAME) => {
                details.push(ValidationDetail::new("name", "is reserved for the root tenant"))
            }
            Some(_) => {}
        }
        if self.parent_id.is_none() {
            details.push(ValidationDetail::new("parentId", "cannot be blank"));
        }
        match ValidationError::from_details(Self::TYPE_NAME, details) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn audit_name(&self) -> String {
        self.name.clone().unwrap_or_default()
    }

    fn bind_fields(&self) -> NamedParams {
        NamedParams::new()
            .with("name", self.name.as_deref().unwrap_or_default().trim())
            .with("active", self.active)
            .with(
                "parent_id",
                SqlParam::optional_integer(self.parent_id.map(TenantId::get)),
            )
    }

    fn scan_returning(&mut self, row: &Row<'_>) -> rusqlite::Result<()> {
        self.id = row.get("id")?;
        self.last_updated = Some(timestamp(row, "last_updated")?);
        Ok(())
    }

    /// The written tenant is authorized against its parent.
    fn resolve_references(&mut self, tx: &SqliteTransaction) -> StorageResult<Option<TenantId>> {
        let Some(parent_id) = self.parent_id else {
            return Err(ValidationError::MissingRequiredField {
                field: "parentId".to_string(),
            }
            .into());
        };
        let parent_name = tenant_name(tx, parent_id)?.ok_or_else(|| ResourceError::NotFound {
            resource_type: Self::TYPE_NAME.to_string(),
            id: parent_id.to_string(),
        })?;
        self.parent_name = Some(parent_name);
        Ok(Some(parent_id))
    }

    /// The root tenant cannot be changed or removed.
    fn existing_tenant(key: &TenantKey, tx: &SqliteTransaction) -> StorageResult<Option<TenantId>> {
        if key.0.is_root() {
            return Err(ValidationError::InvalidKey {
                resource_type: Self::TYPE_NAME.to_string(),
                message: "the root tenant cannot be modified".to_string(),
            }
            .into());
        }
        match tenant_name(tx, key.0)? {
            Some(_) => Ok(Some(key.0)),
            None => Err(ResourceError::NotFound {
                resource_type: Self::TYPE_NAME.to_string(),
                id: key.0.to_string(),
            }
            .into()),
        }
    }

    /// A tenant cannot be moved below itself or one of its descendants.
    fn check_update(&self, key: &TenantKey, tx: &SqliteTransaction) -> StorageResult<()> {
        let Some(parent_id) = self.parent_id else {
            return Ok(());
        };
        if tx.is_in_subtree(parent_id, key.0)? {
            return Err(ValidationError::InvalidResource {
                resource_type: Self::TYPE_NAME.to_string(),
                details: vec![ValidationDetail::new(
                    "parentId",
                    "cannot be the tenant itself or one of its descendants",
                )],
            }
            .into());
        }
        Ok(())
    }
}
