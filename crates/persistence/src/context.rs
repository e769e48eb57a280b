//! Request-scoped context.

use crate::backends::sqlite::SqliteTransaction;
use crate::error::StorageResult;
use crate::query::QueryParams;
use crate::tenant::CurrentUser;

/// Everything one operation needs: its transaction, the acting user and the
/// parsed query parameters.
///
/// Dropping a context without calling [`commit`](Self::commit) rolls the
/// transaction back.
#[derive(Debug)]
pub struct RequestContext {
    tx: SqliteTransaction,
    user: CurrentUser,
    params: QueryParams,
}

impl RequestContext {
    /// Creates a context.
    pub fn new(tx: SqliteTransaction, user: CurrentUser, params: QueryParams) -> Self {
        Self { tx, user, params }
    }

    /// Returns the transaction.
    pub fn tx(&self) -> &SqliteTransaction {
        &self.tx
    }

    /// Returns the acting user.
    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    /// Returns the query parameters.
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Commits the transaction.
    pub fn commit(self) -> StorageResult<()> {
        self.tx.commit()
    }

    /// Rolls the transaction back.
    pub fn rollback(self) -> StorageResult<()> {
        self.tx.rollback()
    }
}
