//! Change log.
//!
//! Each successful mutation appends one row to the `log` table inside the
//! same transaction, so a rolled-back operation leaves no entry.

use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::Serialize;

use crate::backends::sqlite::SqliteTransaction;
use crate::error::StorageResult;
use crate::query::NamedParams;
use crate::resource::{FromRow, timestamp};
use crate::tenant::CurrentUser;

/// The kind of mutation recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// A row was inserted.
    Created,
    /// A row was replaced.
    Updated,
    /// A row was removed.
    Deleted,
    /// Children were associated with a parent.
    Assigned,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeAction::Created => write!(f, "Created"),
            ChangeAction::Updated => write!(f, "Updated"),
            ChangeAction::Deleted => write!(f, "Deleted"),
            ChangeAction::Assigned => write!(f, "Assigned"),
        }
    }
}

/// One change-log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    /// Log row id.
    pub id: i64,
    /// The user who made the change.
    pub user: String,
    /// The formatted change message.
    pub message: String,
    /// When the change was recorded.
    pub last_updated: DateTime<Utc>,
}

impl FromRow for ChangeLogEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user: row.get("user_name")?,
            message: row.get("message")?,
            last_updated: timestamp(row, "last_updated")?,
        })
    }
}

/// Formats a change-log message.
pub fn change_message(type_name: &str, name: &str, action: ChangeAction, keys: &str) -> String {
    format!(
        "{}: {}, ACTION: {}, keys: {}",
        type_name.to_uppercase(),
        name,
        action,
        keys
    )
}

/// Appends a change-log entry.
pub fn record_change(
    tx: &SqliteTransaction,
    user: &CurrentUser,
    type_name: &str,
    name: &str,
    action: ChangeAction,
    keys: &str,
) -> StorageResult<()> {
    let message = change_message(type_name, name, action, keys);
    tx.execute(
        "INSERT INTO log (user_name, message) VALUES (:user_name, :message)",
        &NamedParams::new()
            .with("user_name", user.user_name.as_str())
            .with("message", message.as_str()),
    )?;
    tracing::info!(user = %user.user_name, %message, "change logged");
    Ok(())
}

/// Returns the newest `limit` entries, newest first.
pub fn recent_changes(tx: &SqliteTransaction, limit: u32) -> StorageResult<Vec<ChangeLogEntry>> {
    tx.query_rows(
        "SELECT id, user_name, message, last_updated FROM log ORDER BY id DESC LIMIT :limit",
        &NamedParams::new().with("limit", i64::from(limit)),
    )
}
