//! Tenant-tree queries backing [`TenancyAuthorizer`].

use crate::error::StorageResult;
use crate::query::NamedParams;
use crate::tenant::{CurrentUser, TenancyAuthorizer, TenantId};

use super::SqliteTransaction;

const VISIBLE_TENANTS: &str = "
WITH RECURSIVE visible (id) AS (
    SELECT id FROM tenant WHERE id = :user_tenant
    UNION
    SELECT t.id FROM tenant t JOIN visible v ON t.parent_id = v.id
)
SELECT id FROM visible ORDER BY id";

const RESOURCE_TENANT_ACTIVE: &str = "
WITH RECURSIVE visible (id) AS (
    SELECT id FROM tenant WHERE id = :user_tenant
    UNION
    SELECT t.id FROM tenant t JOIN visible v ON t.parent_id = v.id
)
SELECT t.active FROM tenant t JOIN visible v ON v.id = t.id WHERE t.id = :resource_tenant";

const DESCENDS_FROM: &str = "
WITH RECURSIVE subtree (id) AS (
    SELECT :ancestor
    UNION
    SELECT t.id FROM tenant t JOIN subtree s ON t.parent_id = s.id
)
SELECT 1 FROM subtree WHERE id = :candidate";

impl TenancyAuthorizer for SqliteTransaction {
    fn visible_tenant_ids(&self, user: &CurrentUser) -> StorageResult<Vec<TenantId>> {
        self.query_map(
            VISIBLE_TENANTS,
            &NamedParams::new().with("user_tenant", user.tenant_id.get()),
            |row| row.get(0),
        )
    }

    fn is_authorized(&self, resource_tenant: TenantId, user: &CurrentUser) -> StorageResult<bool> {
        let active: Option<bool> = self.query_optional(
            RESOURCE_TENANT_ACTIVE,
            &NamedParams::new()
                .with("user_tenant", user.tenant_id.get())
                .with("resource_tenant", resource_tenant.get()),
            |row| row.get(0),
        )?;
        Ok(active.unwrap_or(false))
    }
}

impl SqliteTransaction {
    /// Returns whether `candidate` is `ancestor` or lies below it.
    pub fn is_in_subtree(&self, candidate: TenantId, ancestor: TenantId) -> StorageResult<bool> {
        let found: Option<i64> = self.query_optional(
            DESCENDS_FROM,
            &NamedParams::new()
                .with("ancestor", ancestor.get())
                .with("candidate", candidate.get()),
            |row| row.get(0),
        )?;
        Ok(found.is_some())
    }
}
