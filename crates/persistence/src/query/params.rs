//! Named, typed bind parameters.

use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Text parameter.
    Text(String),
    /// Integer parameter.
    Integer(i64),
    /// Boolean parameter, stored as 0/1.
    Boolean(bool),
    /// Null parameter.
    Null,
}

impl SqlParam {
    /// Creates a text parameter.
    pub fn text(s: impl Into<String>) -> Self {
        SqlParam::Text(s.into())
    }

    /// Creates an integer parameter.
    pub fn integer(i: i64) -> Self {
        SqlParam::Integer(i)
    }

    /// Creates an integer parameter, or `Null` when absent.
    pub fn optional_integer(i: Option<i64>) -> Self {
        i.map_or(SqlParam::Null, SqlParam::Integer)
    }

    /// Creates a text parameter, or `Null` when absent.
    pub fn optional_text(s: Option<&str>) -> Self {
        s.map_or(SqlParam::Null, |s| SqlParam::Text(s.to_string()))
    }
}

impl From<i64> for SqlParam {
    fn from(i: i64) -> Self {
        SqlParam::Integer(i)
    }
}

impl From<i32> for SqlParam {
    fn from(i: i32) -> Self {
        SqlParam::Integer(i64::from(i))
    }
}

impl From<&str> for SqlParam {
    fn from(s: &str) -> Self {
        SqlParam::Text(s.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(s: String) -> Self {
        SqlParam::Text(s)
    }
}

impl From<bool> for SqlParam {
    fn from(b: bool) -> Self {
        SqlParam::Boolean(b)
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlParam::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlParam::Boolean(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            SqlParam::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

/// An ordered set of `:name` placeholders and their values.
///
/// Names are stored with their leading colon, exactly as they appear in SQL.
/// Adding a name twice replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams {
    params: Vec<(String, SqlParam)>,
}

impl NamedParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to the placeholder `name` (with or without the colon).
    pub fn insert(&mut self, name: &str, value: impl Into<SqlParam>) {
        let name = if name.starts_with(':') {
            name.to_string()
        } else {
            format!(":{name}")
        };
        let value = value.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.params.push((name, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: &str, value: impl Into<SqlParam>) -> Self {
        self.insert(name, value);
        self
    }

    /// Appends every parameter of `other`.
    pub fn extend(&mut self, other: NamedParams) {
        for (name, value) in other.params {
            self.insert(&name, value);
        }
    }

    /// Returns the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&SqlParam> {
        let name = name.strip_prefix(':').unwrap_or(name);
        self.params
            .iter()
            .find(|(n, _)| &n[1..] == name)
            .map(|(_, v)| v)
    }

    /// Returns the number of bound parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterates over placeholder names (with colon) and values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlParam)> {
        self.params.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Borrows the set in the shape rusqlite accepts for named binding.
    pub fn as_refs(&self) -> Vec<(&str, &dyn ToSql)> {
        self.params
            .iter()
            .map(|(n, v)| (n.as_str(), v as &dyn ToSql))
            .collect()
    }
}
