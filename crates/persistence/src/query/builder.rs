//! Translates client query parameters into bound SQL clauses.

use std::collections::{BTreeMap, HashMap};

use crate::error::{ParameterError, ValidationError};
use crate::tenant::TenantId;

use super::columns::ParamColumns;
use super::params::NamedParams;

/// Raw query parameters as decoded from the request URL.
pub type QueryParams = HashMap<String, String>;

/// Reserved parameter selecting the sort column.
pub const ORDER_BY: &str = "orderby";
/// Reserved parameter selecting the sort direction.
pub const SORT_ORDER: &str = "sortOrder";
/// Reserved parameter limiting the result count.
pub const LIMIT: &str = "limit";
/// Reserved parameter skipping rows.
pub const OFFSET: &str = "offset";
/// Reserved parameter selecting a 1-based page of `limit` rows.
pub const PAGE: &str = "page";

const RESERVED: [&str; 5] = [ORDER_BY, SORT_ORDER, LIMIT, OFFSET, PAGE];

/// Returns true for pagination and ordering parameters.
pub fn is_reserved(param: &str) -> bool {
    RESERVED.contains(&param)
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending (default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// The clauses built for one request.
///
/// All values are carried in [`params`](Self::params) and referenced by
/// `:name` placeholders; no client text is ever spliced into the SQL.
#[derive(Debug, Clone, Default)]
pub struct QueryClauses {
    criteria: Vec<String>,
    order_by: String,
    pagination: String,
    params: NamedParams,
}

impl QueryClauses {
    /// Returns the `WHERE ...` clause, or an empty string.
    pub fn where_clause(&self) -> String {
        if self.criteria.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.criteria.join(" AND "))
        }
    }

    /// Returns the `ORDER BY ...` clause, or an empty string.
    pub fn order_by(&self) -> &str {
        &self.order_by
    }

    /// Returns the `LIMIT ... OFFSET ...` clause, or an empty string.
    pub fn pagination(&self) -> &str {
        &self.pagination
    }

    /// Returns the bound values.
    pub fn params(&self) -> &NamedParams {
        &self.params
    }

    /// Returns true if no clause was produced.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty() && self.order_by.is_empty() && self.pagination.is_empty()
    }

    /// Restricts rows to the given tenants.
    ///
    /// Only rows whose tenant column is in `tenants` match; a NULL tenant
    /// never does. An empty tenant set matches nothing.
    pub fn restrict_to_tenants(&mut self, column: &str, tenants: &[TenantId]) {
        if tenants.is_empty() {
            self.criteria.push("1 = 0".to_string());
            return;
        }
        let mut placeholders = Vec::with_capacity(tenants.len());
        for (i, tenant) in tenants.iter().enumerate() {
            let name = format!(":tenant_id_{i}");
            self.params.insert(&name, tenant.get());
            placeholders.push(name);
        }
        self.criteria
            .push(format!("{column} IN ({})", placeholders.join(", ")));
    }

    /// Appends the clauses to a base select statement.
    pub fn apply_to(&self, base: &str) -> String {
        let mut sql = base.trim_end().to_string();
        let where_clause = self.where_clause();
        for clause in [
            where_clause.as_str(),
            self.order_by.as_str(),
            self.pagination.as_str(),
        ] {
            if !clause.is_empty() {
                sql.push('\n');
                sql.push_str(clause);
            }
        }
        sql
    }
}

/// Builds [`QueryClauses`] from client parameters and an allow-list.
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    columns: &'a ParamColumns,
}

impl<'a> QueryBuilder<'a> {
    /// Creates a builder over the given allow-list.
    pub fn new(columns: &'a ParamColumns) -> Self {
        Self { columns }
    }

    /// Validates `params` and builds the clauses.
    ///
    /// Every malformed value is collected; if any were found the whole
    /// request fails with a single [`ValidationError::InvalidParameters`].
    /// Criteria are emitted in sorted parameter order.
    pub fn build(&self, params: &QueryParams) -> Result<QueryClauses, ValidationError> {
        let mut clauses = QueryClauses::default();
        let mut errors = Vec::new();
        let sorted: BTreeMap<&str, &str> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        for (&param, &value) in &sorted {
            if is_reserved(param) {
                continue;
            }
            let Some(column) = self.columns.get(param) else {
                if self.columns.rejects_unknown() {
                    errors.push(ParameterError::new(param, "unknown query parameter"));
                } else {
                    tracing::debug!(param, "ignoring unrecognized query parameter");
                }
                continue;
            };
            match column.parse(value) {
                Ok(bound) => {
                    let placeholder = placeholder_for(param);
                    clauses
                        .criteria
                        .push(format!("{} = {}", column.column, placeholder));
                    clauses.params.insert(&placeholder, bound);
                }
                Err(message) => errors.push(ParameterError::new(param, message)),
            }
        }

        let order = match sorted.get(SORT_ORDER) {
            Some(value) => SortOrder::parse(value).unwrap_or_else(|| {
                errors.push(ParameterError::new(SORT_ORDER, "must be 'asc' or 'desc'"));
                SortOrder::Asc
            }),
            None => SortOrder::Asc,
        };
        if let Some(&order_key) = sorted.get(ORDER_BY) {
            match self.columns.get(order_key) {
                Some(column) => {
                    clauses.order_by = format!("ORDER BY {} {}", column.column, order.as_sql());
                }
                None if self.columns.rejects_unknown() => {
                    errors.push(ParameterError::new(ORDER_BY, "unknown sort column"));
                }
                None => tracing::debug!(order_key, "ignoring unrecognized sort column"),
            }
        }

        let limit = non_negative(&sorted, LIMIT, &mut errors);
        let offset = non_negative(&sorted, OFFSET, &mut errors);
        let page = match sorted.get(PAGE) {
            Some(value) => match value.trim().parse::<i64>() {
                Ok(page) if page >= 1 => Some(page),
                _ => {
                    errors.push(ParameterError::new(PAGE, "must be a positive integer"));
                    None
                }
            },
            None => None,
        };
        if let Some(limit) = limit {
            clauses.pagination = "LIMIT :query_limit".to_string();
            clauses.params.insert(":query_limit", limit);
            let offset = offset.or_else(|| page.map(|p| (p - 1).saturating_mul(limit)));
            if let Some(offset) = offset {
                clauses.pagination.push_str(" OFFSET :query_offset");
                clauses.params.insert(":query_offset", offset);
            }
        } else if offset.is_some() || page.is_some() {
            tracing::debug!("ignoring offset without limit");
        }

        if !errors.is_empty() {
            return Err(ValidationError::InvalidParameters { errors });
        }
        tracing::debug!(
            where_clause = %clauses.where_clause(),
            order_by = %clauses.order_by,
            pagination = %clauses.pagination,
            "built query clauses"
        );
        Ok(clauses)
    }
}

fn non_negative(
    params: &BTreeMap<&str, &str>,
    name: &str,
    errors: &mut Vec<ParameterError>,
) -> Option<i64> {
    let value = params.get(name)?;
    match value.trim().parse::<i64>() {
        Ok(n) if n >= 0 => Some(n),
        _ => {
            errors.push(ParameterError::new(name, "must be a non-negative integer"));
            None
        }
    }
}

fn placeholder_for(param: &str) -> String {
    let name: String = param
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!(":{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{SqlParam, WhereColumn, is_capability_name};

    fn columns() -> ParamColumns {
        ParamColumns::new()
            .column(
                "deliveryServiceID",
                WhereColumn::integer("rc.deliveryservice_id"),
            )
            .column("xmlID", WhereColumn::text("ds.xml_id"))
            .column(
                "requiredCapability",
                WhereColumn::text("rc.required_capability").with_checker(is_capability_name),
            )
    }

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    #[test]
    fn test_empty_params_yield_empty_clauses() {
        let cols = columns();
        let clauses = QueryBuilder::new(&cols).build(&QueryParams::new()).unwrap();
        assert!(clauses.is_empty());
        assert!(clauses.params().is_empty());
        assert_eq!(clauses.apply_to("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_criteria_are_sorted_and_bound() {
        let cols = columns();
        let clauses = QueryBuilder::new(&cols)
            .build(&params(&[("xmlID", "demo1"), ("deliveryServiceID", "4")]))
            .unwrap();
        assert_eq!(
            clauses.where_clause(),
            "WHERE rc.deliveryservice_id = :deliveryServiceID AND ds.xml_id = :xmlID"
        );
        assert_eq!(
            clauses.params().get("deliveryServiceID"),
            Some(&SqlParam::Integer(4))
        );
        assert_eq!(clauses.params().get("xmlID"), Some(&SqlParam::text("demo1")));
    }

    #[test]
    fn test_values_are_never_interpolated() {
        let cols = columns();
        let clauses = QueryBuilder::new(&cols)
            .build(&params(&[("xmlID", "x' OR '1'='1")]))
            .unwrap();
        assert!(!clauses.where_clause().contains("OR '1'"));
    }

    #[test]
    fn test_unknown_params_ignored_by_default() {
        let cols = columns();
        let clauses = QueryBuilder::new(&cols)
            .build(&params(&[("bogus", "1")]))
            .unwrap();
        assert!(clauses.is_empty());
    }

    #[test]
    fn test_unknown_params_rejected_when_configured() {
        let cols = columns().rejecting_unknown();
        let err = QueryBuilder::new(&cols)
            .build(&params(&[("bogus", "1")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid value for bogus: unknown query parameter");
    }

    #[test]
    fn test_all_errors_are_accumulated() {
        let cols = columns();
        let err = QueryBuilder::new(&cols)
            .build(&params(&[
                ("deliveryServiceID", "abc"),
                ("requiredCapability", "has space"),
                ("limit", "-1"),
            ]))
            .unwrap_err();
        match err {
            ValidationError::InvalidParameters { errors } => {
                let names: Vec<_> = errors.iter().map(|e| e.parameter.as_str()).collect();
                assert_eq!(names, vec!["deliveryServiceID", "requiredCapability", "limit"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // ========================================================================
    // Ordering and pagination
    // ========================================================================

    #[test]
    fn test_order_by_allowed_column() {
        let cols = columns();
        let clauses = QueryBuilder::new(&cols)
            .build(&params(&[("orderby", "xmlID"), ("sortOrder", "desc")]))
            .unwrap();
        assert_eq!(clauses.order_by(), "ORDER BY ds.xml_id DESC");
        assert!(clauses.where_clause().is_empty());
    }

    #[test]
    fn test_order_by_unknown_column_ignored() {
        let cols = columns();
        let clauses = QueryBuilder::new(&cols)
            .build(&params(&[("orderby", "ds.tenant_id; DROP TABLE x")]))
            .unwrap();
        assert_eq!(clauses.order_by(), "");
    }

    #[test]
    fn test_invalid_sort_order() {
        let cols = columns();
        assert!(
            QueryBuilder::new(&cols)
                .build(&params(&[("sortOrder", "sideways")]))
                .is_err()
        );
    }

    #[test]
    fn test_limit_and_offset() {
        let cols = columns();
        let clauses = QueryBuilder::new(&cols)
            .build(&params(&[("limit", "10"), ("offset", "20")]))
            .unwrap();
        assert_eq!(clauses.pagination(), "LIMIT :query_limit OFFSET :query_offset");
        assert_eq!(clauses.params().get("query_limit"), Some(&SqlParam::Integer(10)));
        assert_eq!(clauses.params().get("query_offset"), Some(&SqlParam::Integer(20)));
    }

    #[test]
    fn test_page_computes_offset() {
        let cols = columns();
        let clauses = QueryBuilder::new(&cols)
            .build(&params(&[("limit", "5"), ("page", "3")]))
            .unwrap();
        assert_eq!(clauses.params().get("query_offset"), Some(&SqlParam::Integer(10)));

        assert!(
            QueryBuilder::new(&cols)
                .build(&params(&[("limit", "5"), ("page", "0")]))
                .is_err()
        );
    }

    #[test]
    fn test_offset_without_limit_ignored() {
        let cols = columns();
        let clauses = QueryBuilder::new(&cols)
            .build(&params(&[("offset", "5")]))
            .unwrap();
        assert_eq!(clauses.pagination(), "");
        assert!(clauses.params().is_empty());
    }

    // ========================================================================
    // Tenant scoping
    // ========================================================================

    #[test]
    fn test_restrict_to_tenants() {
        let cols = columns();
        let mut clauses = QueryBuilder::new(&cols)
            .build(&params(&[("xmlID", "demo1")]))
            .unwrap();
        clauses.restrict_to_tenants("ds.tenant_id", &[TenantId::new(1), TenantId::new(3)]);
        assert_eq!(
            clauses.where_clause(),
            "WHERE ds.xml_id = :xmlID AND ds.tenant_id IN (:tenant_id_0, :tenant_id_1)"
        );
        assert_eq!(clauses.params().get("tenant_id_1"), Some(&SqlParam::Integer(3)));
    }

    #[test]
    fn test_restrict_to_no_tenants() {
        let mut clauses = QueryClauses::default();
        clauses.restrict_to_tenants("ds.tenant_id", &[]);
        assert_eq!(clauses.where_clause(), "WHERE 1 = 0");
        assert!(clauses.params().is_empty());
    }

    #[test]
    fn test_apply_to() {
        let cols = columns();
        let clauses = QueryBuilder::new(&cols)
            .build(&params(&[("xmlID", "a"), ("orderby", "xmlID"), ("limit", "1")]))
            .unwrap();
        assert_eq!(
            clauses.apply_to("SELECT * FROM ds "),
            "SELECT * FROM ds\nWHERE ds.xml_id = :xmlID\nORDER BY ds.xml_id ASC\nLIMIT :query_limit"
        );
    }
}
