//! Per-resource allow-lists mapping query parameters to columns.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::LazyLock;

use ipnet::IpNet;
use regex::Regex;

use super::params::SqlParam;

/// A value checker; returns a message describing why the value is invalid.
pub type Checker = fn(&str) -> Result<(), String>;

/// How a parameter value is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Bound as an integer; non-integers are rejected.
    Integer,
    /// Bound as text.
    Text,
    /// Bound as 0/1; accepts `true`/`false`.
    Boolean,
}

/// The column a query parameter filters on.
#[derive(Debug, Clone, Copy)]
pub struct WhereColumn {
    /// Column expression as it appears in the resource's select statement.
    pub column: &'static str,
    /// Binding type.
    pub kind: ColumnKind,
    /// Extra validation run after the type check.
    pub checker: Option<Checker>,
}

impl WhereColumn {
    /// An integer column.
    pub const fn integer(column: &'static str) -> Self {
        Self {
            column,
            kind: ColumnKind::Integer,
            checker: None,
        }
    }

    /// A text column.
    pub const fn text(column: &'static str) -> Self {
        Self {
            column,
            kind: ColumnKind::Text,
            checker: None,
        }
    }

    /// A boolean column.
    pub const fn boolean(column: &'static str) -> Self {
        Self {
            column,
            kind: ColumnKind::Boolean,
            checker: None,
        }
    }

    /// Attaches a value checker.
    pub const fn with_checker(mut self, checker: Checker) -> Self {
        self.checker = Some(checker);
        self
    }

    /// Checks `value` and converts it to its bound form.
    pub fn parse(&self, value: &str) -> Result<SqlParam, String> {
        let param = match self.kind {
            ColumnKind::Integer => SqlParam::Integer(parse_int(value)?),
            ColumnKind::Boolean => SqlParam::Boolean(parse_bool(value)?),
            ColumnKind::Text => SqlParam::text(value),
        };
        if let Some(checker) = self.checker {
            checker(value)?;
        }
        Ok(param)
    }
}

/// The set of query parameters a resource accepts.
///
/// Parameters not in the set are ignored, unless the set was built with
/// [`rejecting_unknown`](Self::rejecting_unknown).
#[derive(Debug, Clone, Default)]
pub struct ParamColumns {
    columns: BTreeMap<&'static str, WhereColumn>,
    reject_unknown: bool,
}

impl ParamColumns {
    /// Creates an empty allow-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `param` and maps it to `column`.
    pub fn column(mut self, param: &'static str, column: WhereColumn) -> Self {
        self.columns.insert(param, column);
        self
    }

    /// Makes unrecognized parameters a validation fault.
    pub fn rejecting_unknown(mut self) -> Self {
        self.reject_unknown = true;
        self
    }

    /// Returns whether unrecognized parameters are rejected.
    pub fn rejects_unknown(&self) -> bool {
        self.reject_unknown
    }

    /// Looks up the column for `param`.
    pub fn get(&self, param: &str) -> Option<&WhereColumn> {
        self.columns.get(param)
    }

    /// Iterates over allowed parameter names in sorted order.
    pub fn params(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.keys().copied()
    }
}

static CAPABILITY_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-_]+$").ok());

/// Accepts base-10 integers.
pub fn is_int(value: &str) -> Result<(), String> {
    parse_int(value).map(|_| ())
}

/// Accepts `true` and `false`.
pub fn is_bool(value: &str) -> Result<(), String> {
    parse_bool(value).map(|_| ())
}

/// Accepts non-negative integers.
pub fn is_non_negative_int(value: &str) -> Result<(), String> {
    match value.trim().parse::<u64>() {
        Ok(_) => Ok(()),
        Err(_) => Err("must be a non-negative integer".to_string()),
    }
}

/// Accepts capability names: letters, digits, `-` and `_`.
pub fn is_capability_name(value: &str) -> Result<(), String> {
    match CAPABILITY_NAME.as_ref() {
        Some(re) if re.is_match(value) => Ok(()),
        _ => Err("must consist of alphanumerics, dashes or underscores".to_string()),
    }
}

/// Parses an IP address or CIDR block; a bare address is a host network.
pub fn parse_ip_net(value: &str) -> Option<IpNet> {
    let value = value.trim();
    value
        .parse::<IpNet>()
        .or_else(|_| value.parse::<IpAddr>().map(IpNet::from))
        .ok()
}

/// Accepts an IP address or an address/prefix CIDR block.
pub fn is_ip_or_cidr(value: &str) -> Result<(), String> {
    match parse_ip_net(value) {
        Some(_) => Ok(()),
        None => Err("must be a valid IP address or CIDR block".to_string()),
    }
}

fn parse_int(value: &str) -> Result<i64, String> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| "must be an integer".to_string())
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err("must be a boolean".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_column() {
        let col = WhereColumn::integer("ds.id");
        assert_eq!(col.parse("12").unwrap(), SqlParam::Integer(12));
        assert_eq!(col.parse("abc").unwrap_err(), "must be an integer");
    }

    #[test]
    fn test_boolean_column() {
        let col = WhereColumn::boolean("t.active");
        assert_eq!(col.parse("true").unwrap(), SqlParam::Boolean(true));
        assert!(col.parse("yes").is_err());
    }

    #[test]
    fn test_checker_runs_after_type() {
        let col = WhereColumn::text("rc.required_capability").with_checker(is_capability_name);
        assert!(col.parse("bulk-ssl_2").is_ok());
        assert!(col.parse("bad name").is_err());
    }

    #[test]
    fn test_ip_or_cidr() {
        assert!(is_ip_or_cidr("192.0.2.1").is_ok());
        assert!(is_ip_or_cidr("192.0.2.0/24").is_ok());
        assert!(is_ip_or_cidr("2001:db8::/32").is_ok());
        assert!(is_ip_or_cidr("192.0.2.0/33").is_err());
        assert!(is_ip_or_cidr("not-an-ip").is_err());
        assert!(is_ip_or_cidr("192.0.2.1/").is_err());
    }

    #[test]
    fn test_parse_ip_net_family() {
        assert!(matches!(parse_ip_net("198.51.100.7"), Some(IpNet::V4(_))));
        assert!(matches!(parse_ip_net("2001:db8::/48"), Some(IpNet::V6(_))));
        assert_eq!(parse_ip_net("2001:db8::1").map(|n| n.prefix_len()), Some(128));
        assert!(parse_ip_net("::/129").is_none());
    }

    #[test]
    fn test_simple_checkers() {
        assert!(is_int("-3").is_ok());
        assert!(is_bool("false").is_ok());
        assert!(is_non_negative_int("0").is_ok());
        assert!(is_non_negative_int("-1").is_err());
    }

    #[test]
    fn test_param_columns_sorted() {
        let cols = ParamColumns::new()
            .column("xmlID", WhereColumn::text("ds.xml_id"))
            .column("deliveryServiceID", WhereColumn::integer("rc.deliveryservice_id"));
        assert_eq!(
            cols.params().collect::<Vec<_>>(),
            vec!["deliveryServiceID", "xmlID"]
        );
        assert!(!cols.rejects_unknown());
        assert!(cols.rejecting_unknown().rejects_unknown());
    }
}
