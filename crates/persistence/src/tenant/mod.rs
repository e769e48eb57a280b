//! Tenant hierarchy and authorization.
//!
//! Every tenant-scoped row carries exactly one owning tenant, either
//! directly or through its parent (a delivery-service capability belongs to
//! the delivery service's tenant). Reads are restricted to the acting user's
//! visible tenants and writes are checked with [`TenancyAuthorizer::authorize`].
//!
//! # Examples
//!
//! ```
//! use cdnops_persistence::tenant::{CurrentUser, TenantId, ROOT_TENANT};
//!
//! let admin = CurrentUser::new("admin", ROOT_TENANT);
//! let operator = CurrentUser::new("ops", TenantId::new(4));
//! assert!(admin.tenant_id.is_root());
//! assert!(!operator.tenant_id.is_root());
//! ```

mod authorizer;
mod id;
mod user;

pub use authorizer::TenancyAuthorizer;
pub use id::{ROOT_TENANT, ROOT_TENANT_NAME, TenantId};
pub use user::CurrentUser;
