//! Delivery-service required capabilities.
//!
//! A required capability links a delivery service to a server capability
//! its cache servers must have. The pair is the whole identity: rows are
//! created and deleted, never updated. The row belongs to the delivery
//! service's tenant.

use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::backends::sqlite::SqliteTransaction;
use crate::error::{ResourceError, StorageResult, ValidationDetail, ValidationError};
use crate::query::{
    NamedParams, ParamColumns, QueryParams, SqlParam, WhereColumn, is_capability_name,
};
use crate::resource::{FromRow, KeyReader, Resource, ResourceKey, timestamp};
use crate::tenant::TenantId;

/// A capability required by a delivery service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryServiceRequiredCapability {
    /// The delivery service id.
    #[serde(rename = "deliveryServiceID", default)]
    pub delivery_service_id: Option<i64>,
    /// The delivery service's XML id; accepted in place of the id on create.
    #[serde(rename = "xmlID", default)]
    pub xml_id: Option<String>,
    /// The server capability name.
    #[serde(default)]
    pub required_capability: Option<String>,
    /// When the row was last written.
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl DeliveryServiceRequiredCapability {
    /// Creates a requirement addressed by delivery-service id.
    pub fn new(delivery_service_id: i64, required_capability: impl Into<String>) -> Self {
        Self {
            delivery_service_id: Some(delivery_service_id),
            required_capability: Some(required_capability.into()),
            ..Self::default()
        }
    }

    /// Creates a requirement addressed by delivery-service XML id.
    pub fn for_xml_id(xml_id: impl Into<String>, required_capability: impl Into<String>) -> Self {
        Self {
            xml_id: Some(xml_id.into()),
            required_capability: Some(required_capability.into()),
            ..Self::default()
        }
    }

    fn delivery_service_name(&self) -> String {
        match (&self.xml_id, self.delivery_service_id) {
            (Some(xml_id), _) => xml_id.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Key of a [`DeliveryServiceRequiredCapability`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityKey {
    /// The delivery service id.
    pub delivery_service_id: i64,
    /// The server capability name.
    pub required_capability: String,
}

impl CapabilityKey {
    /// Creates a key.
    pub fn new(delivery_service_id: i64, required_capability: impl Into<String>) -> Self {
        Self {
            delivery_service_id,
            required_capability: required_capability.into(),
        }
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deliveryServiceID={}, requiredCapability={}",
            self.delivery_service_id, self.required_capability
        )
    }
}

impl ResourceKey for CapabilityKey {
    fn from_params(params: &QueryParams) -> Result<Self, ValidationError> {
        let mut reader = KeyReader::new(params);
        let id = reader.integer("deliveryServiceID");
        let capability = reader.checked_text("requiredCapability", is_capability_name);
        reader.finish(id.zip(capability).map(|(id, cap)| Self::new(id, cap)))
    }

    fn bind(&self) -> NamedParams {
        NamedParams::new()
            .with("deliveryservice_id", self.delivery_service_id)
            .with("required_capability", self.required_capability.as_str())
    }
}

impl FromRow for DeliveryServiceRequiredCapability {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            delivery_service_id: row.get("deliveryservice_id")?,
            xml_id: row.get("xml_id")?,
            required_capability: row.get("required_capability")?,
            last_updated: Some(timestamp(row, "last_updated")?),
        })
    }
}

/// Looks up a delivery service's tenant. The outer `None` means the
/// delivery service does not exist; the inner one that it is untenanted.
pub(crate) fn delivery_service_tenant(
    tx: &SqliteTransaction,
    id: i64,
) -> StorageResult<Option<TenantId>> {
    tx.query_optional(
        "SELECT tenant_id FROM deliveryservice WHERE id = :id",
        &NamedParams::new().with("id", id),
        |row| row.get::<_, Option<TenantId>>(0),
    )?
    .ok_or_else(|| {
        ResourceError::NotFound {
            resource_type: "deliveryservice".to_string(),
            id: id.to_string(),
        }
        .into()
    })
}

impl Resource for DeliveryServiceRequiredCapability {
    type Key = CapabilityKey;

    const TYPE_NAME: &'static str = "deliveryservice_required_capability";
    const TENANT_COLUMN: Option<&'static str> = Some("ds.tenant_id");

    fn select_statement() -> &'static str {
        "SELECT rc.required_capability, rc.deliveryservice_id, ds.xml_id, rc.last_updated
FROM deliveryservice_required_capability rc
JOIN deliveryservice ds ON ds.id = rc.deliveryservice_id"
    }

    fn insert_statement() -> &'static str {
        "INSERT INTO deliveryservice_required_capability (required_capability, deliveryservice_id)
VALUES (:required_capability, :deliveryservice_id)
RETURNING deliveryservice_id, required_capability, last_updated"
    }

    fn delete_statement() -> &'static str {
        "DELETE FROM deliveryservice_required_capability
WHERE deliveryservice_id = :deliveryservice_id AND required_capability = :required_capability"
    }

    fn param_columns() -> ParamColumns {
        ParamColumns::new()
            .column(
                "deliveryServiceID",
                WhereColumn::integer("rc.deliveryservice_id"),
            )
            .column("xmlID", WhereColumn::text("ds.xml_id"))
            .column(
                "requiredCapability",
                WhereColumn::text("rc.required_capability").with_checker(is_capability_name),
            )
    }

    fn keys(&self) -> Option<CapabilityKey> {
        let id = self.delivery_service_id?;
        let capability = self.required_capability.as_ref()?;
        Some(CapabilityKey::new(id, capability.as_str()))
    }

    fn set_keys(&mut self, key: &CapabilityKey) {
        self.delivery_service_id = Some(key.delivery_service_id);
        self.required_capability = Some(key.required_capability.clone());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut details = Vec::new();
        match self.required_capability.as_deref() {
            None | Some("") => {
                details.push(ValidationDetail::new("requiredCapability", "cannot be blank"))
            }
            Some(name) => {
                if let Err(message) = is_capability_name(name) {
                    details.push(ValidationDetail::new("requiredCapability", message));
                }
            }
        }
        let has_xml_id = self.xml_id.as_deref().is_some_and(|x| !x.is_empty());
        if self.delivery_service_id.is_none() && !has_xml_id {
            details.push(ValidationDetail::new(
                "deliveryServiceID",
                "cannot be blank when xmlID is not given",
            ));
        }
        match ValidationError::from_details(Self::TYPE_NAME, details) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn audit_name(&self) -> String {
        self.required_capability.clone().unwrap_or_default()
    }

    fn bind_fields(&self) -> NamedParams {
        NamedParams::new()
            .with(
                "deliveryservice_id",
                SqlParam::optional_integer(self.delivery_service_id),
            )
            .with(
                "required_capability",
                SqlParam::optional_text(self.required_capability.as_deref()),
            )
    }

    fn scan_returning(&mut self, row: &Row<'_>) -> rusqlite::Result<()> {
        self.delivery_service_id = row.get("deliveryservice_id")?;
        self.required_capability = row.get("required_capability")?;
        self.last_updated = Some(timestamp(row, "last_updated")?);
        Ok(())
    }

    /// Resolves the delivery service by id, or by XML id when no id was
    /// given, and checks the capability exists.
    fn resolve_references(&mut self, tx: &SqliteTransaction) -> StorageResult<Option<TenantId>> {
        let found: Option<(i64, String, Option<TenantId>)> =
            match (self.delivery_service_id, self.xml_id.as_deref()) {
                (Some(id), _) => tx.query_optional(
                    "SELECT id, xml_id, tenant_id FROM deliveryservice WHERE id = :id",
                    &NamedParams::new().with("id", id),
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )?,
                (None, Some(xml_id)) => tx.query_optional(
                    "SELECT id, xml_id, tenant_id FROM deliveryservice WHERE xml_id = :xml_id",
                    &NamedParams::new().with("xml_id", xml_id),
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )?,
                (None, None) => None,
            };
        let (id, xml_id, tenant) = found.ok_or_else(|| ResourceError::NotFound {
            resource_type: "deliveryservice".to_string(),
            id: self.delivery_service_name(),
        })?;
        self.delivery_service_id = Some(id);
        self.xml_id = Some(xml_id);

        if let Some(capability) = self.required_capability.as_deref() {
            let exists: Option<i64> = tx.query_optional(
                "SELECT 1 FROM server_capability WHERE name = :name",
                &NamedParams::new().with("name", capability),
                |row| row.get(0),
            )?;
            if exists.is_none() {
                return Err(ResourceError::NotFound {
                    resource_type: "server_capability".to_string(),
                    id: capability.to_string(),
                }
                .into());
            }
        }

        Ok(tenant)
    }

    fn existing_tenant(key: &CapabilityKey, tx: &SqliteTransaction) -> StorageResult<Option<TenantId>> {
        delivery_service_tenant(tx, key.delivery_service_id)
    }
}
