//! Core storage traits.
//!
//! - [`ResourceStorage`] - CRUD over any [`Resource`](crate::resource::Resource)
//! - [`AssignmentStorage`] - assignment with replace semantics
//!
//! Both are implemented by
//! [`SqliteBackend`](crate::backends::sqlite::SqliteBackend).

mod storage;

pub use storage::{AssignmentStorage, ResourceStorage};
