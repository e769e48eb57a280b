//! Async storage traits.
//!
//! Each call is an independent unit of work: it runs in its own
//! transaction, commits only if every step succeeds, and rolls back
//! otherwise.

use async_trait::async_trait;

use crate::assignment::{Assignment, AssignmentRequest, AssignmentSummary};
use crate::error::StorageResult;
use crate::query::QueryParams;
use crate::resource::Resource;
use crate::tenant::CurrentUser;

/// CRUD operations over any [`Resource`].
///
/// # Example
///
/// ```ignore
/// use cdnops_persistence::core::ResourceStorage;
/// use cdnops_persistence::resources::{CapabilityKey, DeliveryServiceRequiredCapability};
/// use cdnops_persistence::tenant::{CurrentUser, ROOT_TENANT};
///
/// async fn example<S: ResourceStorage>(storage: &S) -> Result<(), StorageError> {
///     let admin = CurrentUser::new("admin", ROOT_TENANT);
///
///     let created = storage
///         .create(&admin, DeliveryServiceRequiredCapability::new(1, "ram"))
///         .await?;
///     assert!(created.last_updated.is_some());
///
///     storage
///         .delete::<DeliveryServiceRequiredCapability>(&admin, &CapabilityKey::new(1, "ram"))
///         .await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ResourceStorage: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Reads every row matching `params` that the user can see.
    ///
    /// # Errors
    ///
    /// * `StorageError::Validation` - a parameter value is malformed; no query ran
    async fn read<R: Resource>(&self, user: &CurrentUser, params: QueryParams) -> StorageResult<Vec<R>>;

    /// Creates a resource and returns it with server-assigned fields.
    ///
    /// # Errors
    ///
    /// * `StorageError::Validation` - the resource is incomplete or malformed
    /// * `StorageError::Resource` - a referenced row is missing, or the key exists
    /// * `StorageError::Tenant` - the owning tenant is not visible to the user
    async fn create<R: Resource>(&self, user: &CurrentUser, resource: R) -> StorageResult<R>;

    /// Replaces the row addressed by `key`.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource` - not implemented for the type, or no such row
    async fn update<R: Resource>(
        &self,
        user: &CurrentUser,
        key: &R::Key,
        resource: R,
    ) -> StorageResult<R>;

    /// Deletes the row addressed by `key`.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource` - no such row, or the row is still referenced
    /// * `StorageError::Tenant` - the owning tenant is not visible to the user
    async fn delete<R: Resource>(&self, user: &CurrentUser, key: &R::Key) -> StorageResult<()>;

    /// Deletes the row whose key is given in `params`, returning the key.
    async fn delete_by_params<R: Resource>(
        &self,
        user: &CurrentUser,
        params: QueryParams,
    ) -> StorageResult<R::Key>;
}

/// Assignment of children to a parent.
#[async_trait]
pub trait AssignmentStorage: Send + Sync {
    /// Associates children with a parent, optionally replacing the existing set.
    async fn assign<A: Assignment>(
        &self,
        user: &CurrentUser,
        parent_id: i64,
        request: AssignmentRequest<A::ChildId>,
    ) -> StorageResult<AssignmentSummary>;

    /// Lists the children associated with a parent.
    async fn assigned<A: Assignment>(
        &self,
        user: &CurrentUser,
        parent_id: i64,
    ) -> StorageResult<Vec<A::Assigned>>;
}
