//! CDN Operations Persistence Layer
//!
//! This crate provides the tenant-aware CRUD framework behind the CDN
//! operations API: a generic resource protocol driven by typed resources, a
//! query predicate builder for client-supplied filters, a hierarchical
//! tenancy authorizer, and assignment of child records to a parent with
//! optional replace semantics.
//!
//! # Architecture
//!
//! - [`error`] - Fault taxonomy and HTTP-equivalent status classes
//! - [`tenant`] - Tenant ids, the acting user and the tenancy authorizer
//! - [`query`] - Query predicate builder and per-resource allow-lists
//! - [`resource`] - The [`Resource`](resource::Resource) protocol and its executor
//! - [`resources`] - Concrete resources (required capabilities, tenants, resolvers)
//! - [`assignment`] - Assignment with replace semantics
//! - [`audit`] - Change log written inside each mutating transaction
//! - [`context`] - Request-scoped transaction, user and parameters
//! - [`core`] - Async storage traits
//! - [`backends`] - SQLite implementation
//!
//! # Quick Start
//!
//! ```no_run
//! use cdnops_persistence::backends::sqlite::SqliteBackend;
//! use cdnops_persistence::core::{AssignmentStorage, ResourceStorage};
//! use cdnops_persistence::assignment::{AssignmentRequest, FederationResolverAssignment};
//! use cdnops_persistence::query::QueryParams;
//! use cdnops_persistence::resources::DeliveryServiceRequiredCapability;
//! use cdnops_persistence::tenant::{CurrentUser, ROOT_TENANT};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//! let admin = CurrentUser::new("admin", ROOT_TENANT);
//!
//! let created = backend
//!     .create(&admin, DeliveryServiceRequiredCapability::new(1, "ram"))
//!     .await?;
//! println!("required since {:?}", created.last_updated);
//!
//! let all: Vec<DeliveryServiceRequiredCapability> =
//!     backend.read(&admin, QueryParams::new()).await?;
//! assert_eq!(all.len(), 1);
//!
//! let summary = backend
//!     .assign::<FederationResolverAssignment>(&admin, 5, AssignmentRequest::new(vec![10, 11], false))
//!     .await?;
//! println!("{}", summary.message);
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Every failure is a [`StorageError`](error::StorageError) of exactly one
//! [`ErrorClass`](error::ErrorClass); use
//! [`status_code`](error::StorageError::status_code) to pick a response
//! status and [`client_message`](error::StorageError::client_message) for
//! the response body.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod assignment;
pub mod audit;
pub mod backends;
pub mod context;
pub mod core;
pub mod error;
pub mod query;
pub mod resource;
pub mod resources;
pub mod tenant;

pub use context::RequestContext;
pub use error::{ErrorClass, StorageError, StorageResult};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
