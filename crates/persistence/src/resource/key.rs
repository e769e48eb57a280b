//! Typed resource keys.

use std::fmt;

use crate::error::{ParameterError, ValidationError};
use crate::query::{Checker, NamedParams, QueryParams};

/// The fields that identify one row of a resource.
///
/// Keys are plain typed values; [`ResourceKey::from_params`] parses them
/// from query parameters and [`ResourceKey::bind`] binds them to the
/// placeholders of the delete and update statements.
pub trait ResourceKey: Clone + fmt::Display + Send + Sync + 'static {
    /// Parses the key from query parameters, reporting every missing or
    /// malformed field together.
    fn from_params(params: &QueryParams) -> Result<Self, ValidationError>;

    /// Binds the key fields.
    fn bind(&self) -> NamedParams;
}

/// Reads key fields from query parameters, accumulating faults.
///
/// ```
/// use cdnops_persistence::query::QueryParams;
/// use cdnops_persistence::resource::KeyReader;
///
/// let mut params = QueryParams::new();
/// params.insert("id".to_string(), "x".to_string());
///
/// let mut reader = KeyReader::new(&params);
/// let id = reader.integer("id");
/// let name = reader.text("name");
/// let err = reader.finish(id.zip(name)).unwrap_err();
/// assert_eq!(
///     err.to_string(),
///     "invalid value for id: must be an integer; invalid value for name: is required"
/// );
/// ```
#[derive(Debug)]
pub struct KeyReader<'a> {
    params: &'a QueryParams,
    errors: Vec<ParameterError>,
}

impl<'a> KeyReader<'a> {
    /// Creates a reader over `params`.
    pub fn new(params: &'a QueryParams) -> Self {
        Self {
            params,
            errors: Vec::new(),
        }
    }

    fn required(&mut self, name: &str) -> Option<&'a str> {
        match self.params.get(name) {
            Some(value) if !value.trim().is_empty() => Some(value.as_str()),
            _ => {
                self.errors.push(ParameterError::new(name, "is required"));
                None
            }
        }
    }

    /// Reads a required integer field.
    pub fn integer(&mut self, name: &str) -> Option<i64> {
        let value = self.required(name)?;
        match value.trim().parse() {
            Ok(n) => Some(n),
            Err(_) => {
                self.errors.push(ParameterError::new(name, "must be an integer"));
                None
            }
        }
    }

    /// Reads a required text field.
    pub fn text(&mut self, name: &str) -> Option<String> {
        self.required(name).map(str::to_string)
    }

    /// Reads a required text field and runs `checker` on it.
    pub fn checked_text(&mut self, name: &str, checker: Checker) -> Option<String> {
        let value = self.required(name)?;
        match checker(value) {
            Ok(()) => Some(value.to_string()),
            Err(message) => {
                self.errors.push(ParameterError::new(name, message));
                None
            }
        }
    }

    /// Returns the key, or every accumulated fault.
    pub fn finish<T>(self, key: Option<T>) -> Result<T, ValidationError> {
        if !self.errors.is_empty() {
            return Err(ValidationError::InvalidParameters {
                errors: self.errors,
            });
        }
        key.ok_or_else(|| ValidationError::MissingRequiredField {
            field: "key".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::is_capability_name;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_reads_typed_fields() {
        let params = params(&[("deliveryServiceID", " 12 "), ("requiredCapability", "ram")]);
        let mut reader = KeyReader::new(&params);
        let id = reader.integer("deliveryServiceID");
        let cap = reader.checked_text("requiredCapability", is_capability_name);
        assert_eq!(reader.finish(id.zip(cap)).unwrap(), (12, "ram".to_string()));
    }

    #[test]
    fn test_blank_is_missing() {
        let params = params(&[("id", "  ")]);
        let mut reader = KeyReader::new(&params);
        let id = reader.integer("id");
        let err = reader.finish(id).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for id: is required");
    }

    #[test]
    fn test_checker_failure() {
        let params = params(&[("requiredCapability", "no spaces allowed")]);
        let mut reader = KeyReader::new(&params);
        let cap = reader.checked_text("requiredCapability", is_capability_name);
        assert!(reader.finish(cap).is_err());
    }
}
