//! Hierarchical tenancy authorization.

use crate::error::{StorageResult, TenantError};

use super::{CurrentUser, TenantId};

/// Decides whether a user may see or modify rows owned by a tenant.
///
/// A user's visible set is their own tenant plus every tenant below it in
/// the tree. Results are computed from the current tree state on every call
/// and never cached.
pub trait TenancyAuthorizer {
    /// Returns the ids of every tenant at or below the user's tenant.
    fn visible_tenant_ids(&self, user: &CurrentUser) -> StorageResult<Vec<TenantId>>;

    /// Returns whether `resource_tenant` is visible to the user and active.
    fn is_authorized(&self, resource_tenant: TenantId, user: &CurrentUser) -> StorageResult<bool>;

    /// Fails with an authorization fault unless the user may act on
    /// `resource_tenant`.
    ///
    /// `None` means the row is untenanted and is always authorized.
    fn authorize(&self, resource_tenant: Option<TenantId>, user: &CurrentUser) -> StorageResult<()> {
        let Some(resource_tenant) = resource_tenant else {
            return Ok(());
        };
        if self.is_authorized(resource_tenant, user)? {
            return Ok(());
        }
        tracing::warn!(
            user = %user.user_name,
            user_tenant = %user.tenant_id,
            %resource_tenant,
            "tenant authorization denied"
        );
        Err(TenantError::AccessDenied {
            user_tenant: user.tenant_id,
            resource_tenant,
        }
        .into())
    }
}
