//! Query predicate builder.
//!
//! Turns client-supplied query parameters into a `WHERE` / `ORDER BY` /
//! pagination clause triple plus named bound values. Each resource declares
//! which parameters it accepts through a [`ParamColumns`] allow-list; the
//! reserved keys (`orderby`, `sortOrder`, `limit`, `offset`, `page`) are
//! handled for every resource.
//!
//! # Example
//!
//! ```
//! use cdnops_persistence::query::{ParamColumns, QueryBuilder, QueryParams, WhereColumn};
//!
//! let columns = ParamColumns::new().column("xmlID", WhereColumn::text("ds.xml_id"));
//! let mut params = QueryParams::new();
//! params.insert("xmlID".to_string(), "demo1".to_string());
//! params.insert("limit".to_string(), "10".to_string());
//!
//! let clauses = QueryBuilder::new(&columns).build(&params).unwrap();
//! assert_eq!(clauses.where_clause(), "WHERE ds.xml_id = :xmlID");
//! assert_eq!(clauses.pagination(), "LIMIT :query_limit");
//! ```

mod builder;
mod columns;
mod params;

pub use builder::{
    LIMIT, OFFSET, ORDER_BY, PAGE, QueryBuilder, QueryClauses, QueryParams, SORT_ORDER, SortOrder,
    is_reserved,
};
pub use columns::{
    Checker, ColumnKind, ParamColumns, WhereColumn, is_bool, is_capability_name, is_int,
    is_ip_or_cidr, is_non_negative_int, parse_ip_net,
};
pub use params::{NamedParams, SqlParam};
