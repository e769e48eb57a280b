//! Storage trait implementations for the SQLite backend.
//!
//! rusqlite is synchronous, so every operation runs on the blocking pool
//! with its own pooled connection and transaction.

use async_trait::async_trait;

use crate::assignment::{self, Assignment, AssignmentRequest, AssignmentSummary};
use crate::context::RequestContext;
use crate::core::{AssignmentStorage, ResourceStorage};
use crate::error::{StorageError, StorageResult};
use crate::query::QueryParams;
use crate::resource::{Resource, executor};
use crate::tenant::CurrentUser;

use super::{SqliteBackend, TransactionMode};

impl SqliteBackend {
    /// Runs `op` in a fresh transaction on the blocking pool, committing on
    /// success and rolling back on any error.
    async fn run<T, F>(
        &self,
        operation: &'static str,
        mode: TransactionMode,
        user: &CurrentUser,
        params: QueryParams,
        op: F,
    ) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&RequestContext) -> StorageResult<T> + Send + 'static,
    {
        let backend = self.clone();
        let user = user.clone();
        tokio::task::spawn_blocking(move || {
            let ctx = RequestContext::new(backend.begin(mode)?, user, params);
            let out = match op(&ctx) {
                Ok(out) => out,
                Err(e) => {
                    tracing::debug!(operation, error = %e, class = %e.class(), "operation failed, rolling back");
                    return Err(e);
                }
            };
            ctx.commit()?;
            if mode == TransactionMode::ReadWrite {
                tracing::info!(operation, "committed");
            }
            Ok(out)
        })
        .await
        .map_err(|e| StorageError::internal(format!("storage task failed: {e}")))?
    }
}

#[async_trait]
impl ResourceStorage for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn read<R: Resource>(&self, user: &CurrentUser, params: QueryParams) -> StorageResult<Vec<R>> {
        self.run("read", TransactionMode::ReadOnly, user, params, |ctx| {
            executor::read::<R>(ctx)
        })
        .await
    }

    async fn create<R: Resource>(&self, user: &CurrentUser, resource: R) -> StorageResult<R> {
        self.run(
            "create",
            TransactionMode::ReadWrite,
            user,
            QueryParams::new(),
            move |ctx| executor::create(ctx, resource),
        )
        .await
    }

    async fn update<R: Resource>(
        &self,
        user: &CurrentUser,
        key: &R::Key,
        resource: R,
    ) -> StorageResult<R> {
        let key = key.clone();
        self.run(
            "update",
            TransactionMode::ReadWrite,
            user,
            QueryParams::new(),
            move |ctx| executor::update(ctx, &key, resource),
        )
        .await
    }

    async fn delete<R: Resource>(&self, user: &CurrentUser, key: &R::Key) -> StorageResult<()> {
        let key = key.clone();
        self.run(
            "delete",
            TransactionMode::ReadWrite,
            user,
            QueryParams::new(),
            move |ctx| executor::delete::<R>(ctx, &key),
        )
        .await
    }

    async fn delete_by_params<R: Resource>(
        &self,
        user: &CurrentUser,
        params: QueryParams,
    ) -> StorageResult<R::Key> {
        self.run("delete", TransactionMode::ReadWrite, user, params, |ctx| {
            executor::delete_by_params::<R>(ctx)
        })
        .await
    }
}

#[async_trait]
impl AssignmentStorage for SqliteBackend {
    async fn assign<A: Assignment>(
        &self,
        user: &CurrentUser,
        parent_id: i64,
        request: AssignmentRequest<A::ChildId>,
    ) -> StorageResult<AssignmentSummary> {
        self.run(
            "assign",
            TransactionMode::ReadWrite,
            user,
            QueryParams::new(),
            move |ctx| assignment::assign::<A>(ctx, parent_id, request),
        )
        .await
    }

    async fn assigned<A: Assignment>(
        &self,
        user: &CurrentUser,
        parent_id: i64,
    ) -> StorageResult<Vec<A::Assigned>> {
        self.run(
            "assigned",
            TransactionMode::ReadOnly,
            user,
            QueryParams::new(),
            move |ctx| assignment::assigned::<A>(ctx, parent_id),
        )
        .await
    }
}
