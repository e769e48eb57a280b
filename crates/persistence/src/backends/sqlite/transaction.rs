//! Transaction handle for the SQLite backend.

use parking_lot::Mutex;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, Row};

use crate::error::{StorageError, StorageResult, TransactionError};
use crate::query::NamedParams;
use crate::resource::FromRow;

/// How a transaction is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Deferred transaction; takes no write lock until a write happens.
    ReadOnly,
    /// `BEGIN IMMEDIATE`; takes the write lock up front.
    ReadWrite,
}

/// A SQLite transaction.
///
/// Every statement of one operation runs through the same handle. The
/// transaction commits only through [`commit`](Self::commit); dropping an
/// uncommitted handle rolls it back.
pub struct SqliteTransaction {
    /// The connection used for this transaction.
    conn: Mutex<PooledConnection<SqliteConnectionManager>>,
    /// Whether the transaction is still active.
    active: bool,
    mode: TransactionMode,
}

impl std::fmt::Debug for SqliteTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTransaction")
            .field("active", &self.active)
            .field("mode", &self.mode)
            .finish()
    }
}

impl SqliteTransaction {
    /// Starts a transaction on a pooled connection.
    pub(crate) fn begin(
        conn: PooledConnection<SqliteConnectionManager>,
        mode: TransactionMode,
    ) -> StorageResult<Self> {
        let begin = match mode {
            TransactionMode::ReadOnly => "BEGIN",
            TransactionMode::ReadWrite => "BEGIN IMMEDIATE",
        };
        conn.execute_batch(begin).map_err(|e| {
            StorageError::Transaction(TransactionError::BeginFailed {
                reason: e.to_string(),
            })
        })?;

        Ok(Self {
            conn: Mutex::new(conn),
            active: true,
            mode,
        })
    }

    /// Returns the mode the transaction was opened with.
    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Returns whether the transaction is still open.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Runs a query and scans every row into `T`.
    pub fn query_rows<T: FromRow>(&self, sql: &str, params: &NamedParams) -> StorageResult<Vec<T>> {
        self.query_map(sql, params, T::from_row)
    }

    /// Runs a query and maps every row with `f`.
    pub fn query_map<T, F>(&self, sql: &str, params: &NamedParams, mut f: F) -> StorageResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        tracing::debug!(sql, params = params.len(), "query");
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params.as_refs().as_slice())?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(f(row)?);
        }
        Ok(out)
    }

    /// Runs a query expected to return at most one row.
    pub fn query_optional<T, F>(&self, sql: &str, params: &NamedParams, f: F) -> StorageResult<Option<T>>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        tracing::debug!(sql, params = params.len(), "query");
        let conn = self.conn.lock();
        Ok(conn
            .query_row(sql, params.as_refs().as_slice(), f)
            .optional()?)
    }

    /// Runs a statement with a `RETURNING` clause, handing each returned row
    /// to `f`, and returns the number of rows returned.
    pub fn for_each_row<F>(&self, sql: &str, params: &NamedParams, mut f: F) -> StorageResult<usize>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<()>,
    {
        tracing::debug!(sql, params = params.len(), "statement");
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params.as_refs().as_slice())?;
        let mut count = 0;
        while let Some(row) = rows.next()? {
            f(row)?;
            count += 1;
        }
        Ok(count)
    }

    /// Executes a statement and returns the number of affected rows.
    pub fn execute(&self, sql: &str, params: &NamedParams) -> StorageResult<usize> {
        tracing::debug!(sql, params = params.len(), "statement");
        let conn = self.conn.lock();
        Ok(conn.execute(sql, params.as_refs().as_slice())?)
    }

    /// Commits the transaction.
    pub fn commit(mut self) -> StorageResult<()> {
        self.conn.lock().execute_batch("COMMIT").map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Commit failed: {}", e),
            })
        })?;

        self.active = false;
        Ok(())
    }

    /// Rolls the transaction back.
    pub fn rollback(mut self) -> StorageResult<()> {
        self.active = false;
        self.conn.lock().execute_batch("ROLLBACK").map_err(|e| {
            StorageError::Transaction(TransactionError::RolledBack {
                reason: format!("Rollback failed: {}", e),
            })
        })
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.conn.lock().execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "failed to roll back abandoned transaction");
            }
        }
    }
}
