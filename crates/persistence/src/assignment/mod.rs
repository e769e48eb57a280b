//! Assignment with replace semantics.
//!
//! Associates a batch of child ids with one parent inside a single
//! transaction, optionally clearing the parent's existing associations
//! first. Either every association in the call is stored or none is.
//!
//! Re-associating a child that is already associated is not an error:
//! requested ids are de-duplicated and inserted with `ON CONFLICT DO
//! NOTHING`, so the call is idempotent.

mod targets;

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::audit::{ChangeAction, record_change};
use crate::backends::sqlite::SqliteTransaction;
use crate::context::RequestContext;
use crate::error::{ResourceError, StorageResult};
use crate::query::{NamedParams, SqlParam};
use crate::resource::FromRow;
use crate::tenant::{TenancyAuthorizer, TenantId};

pub use targets::{FederationResolverAssignment, RequiredCapabilityAssignment};

/// A parent/child association that supports assignment.
///
/// Every statement binds the parent as `:parent_id`; per-child statements
/// also bind `:child_id`.
pub trait Assignment: Send + Sync + 'static {
    /// The child identifier.
    type ChildId: Clone
        + Eq
        + Hash
        + fmt::Display
        + Into<SqlParam>
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// The records listed by [`assigned`].
    type Assigned: FromRow + Serialize + Send + 'static;

    /// Parent noun used in messages, e.g. `federation`.
    const PARENT_NOUN: &'static str;
    /// Child noun used in messages, e.g. `resolver`.
    const CHILD_NOUN: &'static str;

    /// Selects the parent's display name.
    const PARENT_NAME_QUERY: &'static str;
    /// Selects any row when the child exists.
    const CHILD_EXISTS_QUERY: &'static str;
    /// Removes every association of the parent.
    const CLEAR_STATEMENT: &'static str;
    /// Associates one child, doing nothing if already associated.
    const ASSOCIATE_STATEMENT: &'static str;
    /// Lists the parent's children.
    const ASSIGNED_QUERY: &'static str;

    /// Returns the tenant owning an existing parent; `None` if untenanted.
    fn parent_tenant(_parent_id: i64, _tx: &SqliteTransaction) -> StorageResult<Option<TenantId>> {
        Ok(None)
    }
}

/// Request body of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRequest<C> {
    /// The children to associate.
    #[serde(
        rename = "childIDs",
        alias = "fedResolverIds",
        alias = "resolverIDs",
        alias = "requiredCapabilities",
        default = "Vec::new"
    )]
    pub child_ids: Vec<C>,
    /// Clear existing associations first.
    #[serde(default)]
    pub replace: bool,
}

impl<C> AssignmentRequest<C> {
    /// Creates a request.
    pub fn new(child_ids: Vec<C>, replace: bool) -> Self {
        Self { child_ids, replace }
    }
}

/// Outcome of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSummary {
    /// The parent id.
    pub parent_id: i64,
    /// The parent's display name.
    pub parent_name: String,
    /// Distinct children requested.
    pub requested: usize,
    /// Children that were not associated before this call.
    pub newly_assigned: usize,
    /// Associations removed by `replace`.
    pub removed: usize,
    /// Whether existing associations were cleared first.
    pub replace: bool,
    /// Human-readable result.
    pub message: String,
}

fn parent_name<A: Assignment>(tx: &SqliteTransaction, parent_id: i64) -> StorageResult<String> {
    let name: Option<String> = tx.query_optional(
        A::PARENT_NAME_QUERY,
        &NamedParams::new().with("parent_id", parent_id),
        |row| row.get(0),
    )?;
    name.ok_or_else(|| {
        ResourceError::NotFound {
            resource_type: A::PARENT_NOUN.to_string(),
            id: parent_id.to_string(),
        }
        .into()
    })
}

fn dedupe<C: Clone + Eq + Hash>(ids: Vec<C>) -> Vec<C> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Associates `request.child_ids` with `parent_id`.
///
/// The parent must exist (not-found otherwise) and be visible to the user.
/// Every child must exist; an unknown child is a not-found fault raised
/// before anything is written. An empty request with `replace` clears the
/// parent; without `replace` it changes nothing.
pub fn assign<A: Assignment>(
    ctx: &RequestContext,
    parent_id: i64,
    request: AssignmentRequest<A::ChildId>,
) -> StorageResult<AssignmentSummary> {
    let tx = ctx.tx();
    let name = parent_name::<A>(tx, parent_id)?;
    tx.authorize(A::parent_tenant(parent_id, tx)?, ctx.user())?;

    let children = dedupe(request.child_ids);
    for child in &children {
        let exists: Option<i64> = tx.query_optional(
            A::CHILD_EXISTS_QUERY,
            &NamedParams::new().with("child_id", child.clone()),
            |row| row.get(0),
        )?;
        if exists.is_none() {
            return Err(ResourceError::NotFound {
                resource_type: A::CHILD_NOUN.to_string(),
                id: child.to_string(),
            }
            .into());
        }
    }

    let parent = NamedParams::new().with("parent_id", parent_id);
    let removed = if request.replace {
        tx.execute(A::CLEAR_STATEMENT, &parent)?
    } else {
        0
    };

    let mut newly_assigned = 0;
    for child in &children {
        let params = parent.clone().with("child_id", child.clone());
        newly_assigned += tx
            .execute(A::ASSOCIATE_STATEMENT, &params)
            .map_err(|e| e.for_resource(A::CHILD_NOUN, &child.to_string(), false))?;
    }

    let message = format!(
        "{} {}(s) were assigned to the {} {}",
        children.len(),
        A::CHILD_NOUN,
        name,
        A::PARENT_NOUN
    );
    let ids = children
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    record_change(
        tx,
        ctx.user(),
        A::PARENT_NOUN,
        &name,
        ChangeAction::Assigned,
        &format!("id={parent_id}, {}s=[{ids}], replace={}", A::CHILD_NOUN, request.replace),
    )?;

    Ok(AssignmentSummary {
        parent_id,
        parent_name: name,
        requested: children.len(),
        newly_assigned,
        removed,
        replace: request.replace,
        message,
    })
}

/// Lists the children associated with `parent_id`.
pub fn assigned<A: Assignment>(ctx: &RequestContext, parent_id: i64) -> StorageResult<Vec<A::Assigned>> {
    let tx = ctx.tx();
    parent_name::<A>(tx, parent_id)?;
    tx.authorize(A::parent_tenant(parent_id, tx)?, ctx.user())?;
    tx.query_rows(
        A::ASSIGNED_QUERY,
        &NamedParams::new().with("parent_id", parent_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        assert_eq!(dedupe(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(dedupe(Vec::<i64>::new()).is_empty());
    }

    #[test]
    fn test_request_field_aliases() {
        let req: AssignmentRequest<i64> =
            serde_json::from_str(r#"{"fedResolverIds": [1, 2], "replace": true}"#).unwrap();
        assert_eq!(req, AssignmentRequest::new(vec![1, 2], true));

        let req: AssignmentRequest<i64> =
            serde_json::from_str(r#"{"resolverIDs": [4]}"#).unwrap();
        assert_eq!(req, AssignmentRequest::new(vec![4], false));

        let req: AssignmentRequest<String> =
            serde_json::from_str(r#"{"replace": true}"#).unwrap();
        assert!(req.child_ids.is_empty());
        assert!(req.replace);
    }
}
