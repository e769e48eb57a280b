//! Tenant identifier type.
//!
//! Tenants form a strict tree rooted at [`ROOT_TENANT`]. A [`TenantId`] is
//! the integer primary key of a row in the `tenant` table.

use std::fmt;
use std::str::FromStr;

use rusqlite::ToSql;
use rusqlite::types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// The tenant seeded at the top of every tenant tree.
pub const ROOT_TENANT: TenantId = TenantId(1);

/// The name of the root tenant.
pub const ROOT_TENANT_NAME: &str = "root";

/// Identifier of a node in the tenant tree.
///
/// # Examples
///
/// ```
/// use cdnops_persistence::tenant::{TenantId, ROOT_TENANT};
///
/// let tenant = TenantId::new(1);
/// assert_eq!(tenant, ROOT_TENANT);
/// assert_eq!(tenant.to_string(), "1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(i64);

impl TenantId {
    /// Creates a tenant ID from its database key.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying database key.
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns `true` if this is the root tenant.
    pub fn is_root(self) -> bool {
        self == ROOT_TENANT
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<i64> for TenantId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl ToSql for TenantId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for TenantId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self)
    }
}
