//! Drives read, create, update and delete for any [`Resource`].
//!
//! Validation and authorization run before any mutating statement. The
//! caller owns the transaction in the [`RequestContext`]; any error returned
//! here leaves it uncommitted, so dropping the context rolls everything back.

use crate::audit::{ChangeAction, record_change};
use crate::context::RequestContext;
use crate::error::{BackendError, ResourceError, StorageError, StorageResult};
use crate::query::QueryBuilder;
use crate::tenant::TenancyAuthorizer;

use super::{Resource, ResourceKey};

/// Reads every row matching the context's query parameters.
///
/// Parameters are validated before the store is touched. Tenant-scoped types
/// only return rows owned by tenants visible to the user. No match is an
/// empty vector.
pub fn read<R: Resource>(ctx: &RequestContext) -> StorageResult<Vec<R>> {
    let columns = R::param_columns();
    let mut clauses = QueryBuilder::new(&columns).build(ctx.params())?;

    if let Some(column) = R::TENANT_COLUMN {
        let visible = ctx.tx().visible_tenant_ids(ctx.user())?;
        clauses.restrict_to_tenants(column, &visible);
    }

    let sql = clauses.apply_to(R::select_statement());
    ctx.tx().query_rows(&sql, clauses.params())
}

/// Inserts a resource and returns it with its server-assigned fields.
pub fn create<R: Resource>(ctx: &RequestContext, mut resource: R) -> StorageResult<R> {
    resource.validate()?;
    let tenant = resource.resolve_references(ctx.tx())?;
    ctx.tx().authorize(tenant, ctx.user())?;

    let name = resource.audit_name();
    let params = resource.bind_fields();
    let mut scanned = false;
    let returned = ctx
        .tx()
        .for_each_row(R::insert_statement(), &params, |row| {
            if !scanned {
                scanned = true;
                resource.scan_returning(row)?;
            }
            Ok(())
        })
        .map_err(|e| e.for_resource(R::TYPE_NAME, &name, false))?;
    expect_one_row::<R>("insert", returned)?;

    let key = resource
        .keys()
        .ok_or_else(|| StorageError::internal(format!("created {} has no key", R::TYPE_NAME)))?;
    record_change(
        ctx.tx(),
        ctx.user(),
        R::TYPE_NAME,
        &name,
        ChangeAction::Created,
        &key.to_string(),
    )?;
    Ok(resource)
}

/// Replaces the row addressed by `key`.
///
/// Types without an update statement fail with a not-implemented fault
/// before anything else runs.
pub fn update<R: Resource>(ctx: &RequestContext, key: &R::Key, mut resource: R) -> StorageResult<R> {
    let Some(statement) = R::update_statement() else {
        return Err(ResourceError::NotImplemented {
            resource_type: R::TYPE_NAME.to_string(),
            operation: "update".to_string(),
        }
        .into());
    };

    resource.set_keys(key);
    resource.validate()?;
    let existing = R::existing_tenant(key, ctx.tx())?;
    ctx.tx().authorize(existing, ctx.user())?;
    resource.check_update(key, ctx.tx())?;
    let tenant = resource.resolve_references(ctx.tx())?;
    ctx.tx().authorize(tenant, ctx.user())?;

    let name = resource.audit_name();
    let mut params = resource.bind_fields();
    params.extend(key.bind());
    let mut scanned = false;
    let returned = ctx
        .tx()
        .for_each_row(statement, &params, |row| {
            if !scanned {
                scanned = true;
                resource.scan_returning(row)?;
            }
            Ok(())
        })
        .map_err(|e| e.for_resource(R::TYPE_NAME, &name, false))?;
    if returned == 0 {
        return Err(not_found::<R>(key));
    }
    expect_one_row::<R>("update", returned)?;

    record_change(
        ctx.tx(),
        ctx.user(),
        R::TYPE_NAME,
        &name,
        ChangeAction::Updated,
        &key.to_string(),
    )?;
    Ok(resource)
}

/// Deletes the row addressed by `key`.
///
/// A key matching no row is a not-found fault.
pub fn delete<R: Resource>(ctx: &RequestContext, key: &R::Key) -> StorageResult<()> {
    let existing = R::existing_tenant(key, ctx.tx())?;
    ctx.tx().authorize(existing, ctx.user())?;

    let key_text = key.to_string();
    let affected = ctx
        .tx()
        .execute(R::delete_statement(), &key.bind())
        .map_err(|e| e.for_resource(R::TYPE_NAME, &key_text, true))?;
    if affected == 0 {
        return Err(not_found::<R>(key));
    }
    expect_one_row::<R>("delete", affected)?;

    record_change(
        ctx.tx(),
        ctx.user(),
        R::TYPE_NAME,
        &key_text,
        ChangeAction::Deleted,
        &key_text,
    )
}

/// Parses the key from the context's query parameters and deletes that row.
pub fn delete_by_params<R: Resource>(ctx: &RequestContext) -> StorageResult<R::Key> {
    let key = R::Key::from_params(ctx.params())?;
    delete::<R>(ctx, &key)?;
    Ok(key)
}

fn not_found<R: Resource>(key: &R::Key) -> StorageError {
    ResourceError::NotFound {
        resource_type: R::TYPE_NAME.to_string(),
        id: key.to_string(),
    }
    .into()
}

fn expect_one_row<R: Resource>(operation: &str, count: usize) -> StorageResult<()> {
    if count == 1 {
        return Ok(());
    }
    tracing::error!(
        resource_type = R::TYPE_NAME,
        operation,
        count,
        "statement touched an unexpected number of rows"
    );
    Err(StorageError::Backend(BackendError::UnexpectedRowCount {
        operation: operation.to_string(),
        resource_type: R::TYPE_NAME.to_string(),
        count,
    }))
}
