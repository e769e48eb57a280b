//! Federation resolvers.

use std::fmt;

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationDetail, ValidationError};
use crate::query::{NamedParams, ParamColumns, QueryParams, SqlParam, WhereColumn, parse_ip_net};
use crate::resource::{FromRow, KeyReader, Resource, ResourceKey, timestamp};

/// Resolver type for IPv4 addresses.
pub const RESOLVE4: &str = "RESOLVE4";
/// Resolver type for IPv6 addresses.
pub const RESOLVE6: &str = "RESOLVE6";

/// A resolver address that federations can be mapped to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationResolver {
    /// Server-assigned id.
    #[serde(default)]
    pub id: Option<i64>,
    /// IP address or CIDR block.
    #[serde(default)]
    pub ip_address: Option<String>,
    /// `RESOLVE4` or `RESOLVE6`.
    #[serde(rename = "type", default)]
    pub resolver_type: Option<String>,
    /// When the row was last written.
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl FederationResolver {
    /// Creates a resolver, picking the type from the address family.
    pub fn new(ip_address: impl Into<String>) -> Self {
        let ip_address = ip_address.into();
        let resolver_type = match parse_ip_net(&ip_address) {
            Some(IpNet::V6(_)) => RESOLVE6,
            _ => RESOLVE4,
        };
        Self {
            ip_address: Some(ip_address),
            resolver_type: Some(resolver_type.to_string()),
            ..Self::default()
        }
    }
}

/// Key of a [`FederationResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolverId(pub i64);

impl fmt::Display for ResolverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id={}", self.0)
    }
}

impl ResourceKey for ResolverId {
    fn from_params(params: &QueryParams) -> Result<Self, ValidationError> {
        let mut reader = KeyReader::new(params);
        let id = reader.integer("id");
        reader.finish(id.map(Self))
    }

    fn bind(&self) -> NamedParams {
        NamedParams::new().with("id", self.0)
    }
}

impl FromRow for FederationResolver {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            ip_address: row.get("ip_address")?,
            resolver_type: row.get("type")?,
            last_updated: Some(timestamp(row, "last_updated")?),
        })
    }
}

impl Resource for FederationResolver {
    type Key = ResolverId;

    const TYPE_NAME: &'static str = "federation_resolver";

    fn select_statement() -> &'static str {
        "SELECT fr.id, fr.ip_address, fr.type, fr.last_updated
FROM federation_resolver fr"
    }

    fn insert_statement() -> &'static str {
        "INSERT INTO federation_resolver (ip_address, type)
VALUES (:ip_address, :type)
RETURNING id, last_updated"
    }

    fn delete_statement() -> &'static str {
        "DELETE FROM federation_resolver WHERE id = :id"
    }

    fn param_columns() -> ParamColumns {
        ParamColumns::new()
            .column("id", WhereColumn::integer("fr.id"))
            .column("ipAddress", WhereColumn::text("fr.ip_address"))
            .column("type", WhereColumn::text("fr.type"))
    }

    fn keys(&self) -> Option<ResolverId> {
        self.id.map(ResolverId)
    }

    fn set_keys(&mut self, key: &ResolverId) {
        self.id = Some(key.0);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut details = Vec::new();
        let family = match self.ip_address.as_deref() {
            None | Some("") => {
                details.push(ValidationDetail::new("ipAddress", "cannot be blank"));
                None
            }
            Some(addr) => {
                let net = parse_ip_net(addr);
                if net.is_none() {
                    details.push(ValidationDetail::new(
                        "ipAddress",
                        "must be a valid IP address or CIDR block",
                    ));
                }
                net
            }
        };
        match (self.resolver_type.as_deref(), family) {
            (None | Some(""), _) => details.push(ValidationDetail::new("type", "cannot be blank")),
            (Some(RESOLVE4), Some(IpNet::V6(_))) => details.push(ValidationDetail::new(
                "type",
                "RESOLVE4 requires an IPv4 address",
            )),
            (Some(RESOLVE6), Some(IpNet::V4(_))) => details.push(ValidationDetail::new(
                "type",
                "RESOLVE6 requires an IPv6 address",
            )),
            (Some(RESOLVE4 | RESOLVE6), _) => {}
            (Some(_), _) => details.push(ValidationDetail::new(
                "type",
                "must be RESOLVE4 or RESOLVE6",
            )),
        }
        match ValidationError::from_details(Self::TYPE_NAME, details) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn audit_name(&self) -> String {
        self.ip_address.clone().unwrap_or_default()
    }

    fn bind_fields(&self) -> NamedParams {
        NamedParams::new()
            .with("ip_address", SqlParam::optional_text(self.ip_address.as_deref()))
            .with("type", SqlParam::optional_text(self.resolver_type.as_deref()))
    }

    fn scan_returning(&mut self, row: &Row<'_>) -> rusqlite::Result<()> {
        self.id = row.get("id")?;
        self.last_updated = Some(timestamp(row, "last_updated")?);
        Ok(())
    }
}
