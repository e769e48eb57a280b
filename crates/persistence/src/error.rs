//! Error types for the persistence layer.
//!
//! Every fault raised by the CRUD framework belongs to exactly one
//! [`ErrorClass`], which is what callers use to pick an HTTP status. The
//! enums below are organized by where the fault originates (resource state,
//! tenancy, validation, transaction, backend), and [`StorageError::class`]
//! folds them into the class taxonomy.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

use crate::tenant::TenantId;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Tenant authorization errors
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Transaction errors
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to resource state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested resource (or the parent it references) was not found.
    #[error("{resource_type} not found: {id}")]
    NotFound { resource_type: String, id: String },

    /// A resource with the same key already exists.
    #[error("{resource_type} already exists: {id}")]
    AlreadyExists { resource_type: String, id: String },

    /// A row referenced by the resource does not exist.
    #[error("{resource_type} {id} references a record that does not exist")]
    ReferenceNotFound { resource_type: String, id: String },

    /// The resource is still referenced by other rows and cannot be removed.
    #[error("{resource_type} {id} is still in use")]
    InUse { resource_type: String, id: String },

    /// The operation is not implemented for this resource type.
    #[error("{operation} is not implemented for {resource_type}")]
    NotImplemented {
        resource_type: String,
        operation: String,
    },
}

/// Errors related to tenant authorization.
#[derive(Error, Debug)]
pub enum TenantError {
    /// The acting user's tenant does not dominate the resource's tenant.
    #[error("not authorized on this tenant: user tenant {user_tenant} cannot access tenant {resource_tenant}")]
    AccessDenied {
        user_tenant: TenantId,
        resource_tenant: TenantId,
    },
}

/// Errors related to resource and request validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The resource failed validation.
    #[error("invalid {resource_type}: {}", join_details(.details))]
    InvalidResource {
        resource_type: String,
        details: Vec<ValidationDetail>,
    },

    /// One or more query parameters carry malformed values.
    ///
    /// All accumulated parameter faults are reported together.
    #[error("{}", join_parameters(.errors))]
    InvalidParameters { errors: Vec<ParameterError> },

    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// The resource's key could not be determined.
    #[error("invalid key for {resource_type}: {message}")]
    InvalidKey {
        resource_type: String,
        message: String,
    },
}

impl ValidationError {
    /// Builds an `InvalidResource` error, or `None` when there are no details.
    pub fn from_details(resource_type: &str, details: Vec<ValidationDetail>) -> Option<Self> {
        if details.is_empty() {
            None
        } else {
            Some(ValidationError::InvalidResource {
                resource_type: resource_type.to_string(),
                details,
            })
        }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetail {
    /// The field that failed validation.
    pub field: String,
    /// A human-readable message.
    pub message: String,
}

impl ValidationDetail {
    /// Creates a detail for the given field.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A malformed query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterError {
    /// The query parameter name as supplied by the client.
    pub parameter: String,
    /// Why the value was rejected.
    pub message: String,
}

impl ParameterError {
    /// Creates a parameter error.
    pub fn new(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value for {}: {}", self.parameter, self.message)
    }
}

fn join_details(details: &[ValidationDetail]) -> String {
    details
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_parameters(errors: &[ParameterError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors related to transactions.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// The transaction could not be started.
    #[error("failed to begin transaction: {reason}")]
    BeginFailed { reason: String },

    /// The transaction could not be committed and was rolled back.
    #[error("transaction rolled back: {reason}")]
    RolledBack { reason: String },

    /// The transaction was already committed or rolled back.
    #[error("transaction is no longer active")]
    InvalidTransaction,
}

/// The kind of store constraint that was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Primary key or unique index.
    Unique,
    /// Foreign key.
    ForeignKey,
    /// NOT NULL, CHECK and anything else.
    Other,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::Unique => write!(f, "unique"),
            ConstraintKind::ForeignKey => write!(f, "foreign key"),
            ConstraintKind::Other => write!(f, "check"),
        }
    }
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// A store constraint rejected a statement.
    #[error("{kind} constraint violated: {message}")]
    ConstraintViolation {
        kind: ConstraintKind,
        message: String,
    },

    /// A statement touched a different number of rows than the protocol requires.
    #[error("{operation} of {resource_type} affected {count} rows")]
    UnexpectedRowCount {
        operation: String,
        resource_type: String,
        count: usize,
    },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// The fault class of an error, used to pick an HTTP-equivalent status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed input; nothing was written.
    Validation,
    /// The acting user's tenant cannot see the resource.
    Authorization,
    /// A referenced row does not exist.
    NotFound,
    /// A uniqueness or referential conflict.
    Conflict,
    /// The operation is not available for this resource.
    NotImplemented,
    /// Store failure or protocol violation.
    Internal,
}

impl ErrorClass {
    /// Returns the HTTP-equivalent status code for this class.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorClass::Validation => 400,
            ErrorClass::Authorization => 403,
            ErrorClass::NotFound => 404,
            ErrorClass::Conflict => 409,
            ErrorClass::NotImplemented => 501,
            ErrorClass::Internal => 500,
        }
    }

    /// Returns `true` for faults caused by the client.
    pub fn is_client_fault(self) -> bool {
        !matches!(self, ErrorClass::Internal | ErrorClass::NotImplemented)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Validation => write!(f, "validation"),
            ErrorClass::Authorization => write!(f, "authorization"),
            ErrorClass::NotFound => write!(f, "not-found"),
            ErrorClass::Conflict => write!(f, "conflict"),
            ErrorClass::NotImplemented => write!(f, "not-implemented"),
            ErrorClass::Internal => write!(f, "internal"),
        }
    }
}

impl StorageError {
    /// Returns the fault class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            StorageError::Resource(err) => match err {
                ResourceError::NotFound { .. } | ResourceError::ReferenceNotFound { .. } => {
                    ErrorClass::NotFound
                }
                ResourceError::AlreadyExists { .. } | ResourceError::InUse { .. } => {
                    ErrorClass::Conflict
                }
                ResourceError::NotImplemented { .. } => ErrorClass::NotImplemented,
            },
            StorageError::Tenant(_) => ErrorClass::Authorization,
            StorageError::Validation(_) => ErrorClass::Validation,
            StorageError::Transaction(_) => ErrorClass::Internal,
            StorageError::Backend(BackendError::ConstraintViolation { .. }) => {
                ErrorClass::Conflict
            }
            StorageError::Backend(_) => ErrorClass::Internal,
        }
    }

    /// Returns the HTTP-equivalent status code for this error.
    pub fn status_code(&self) -> u16 {
        self.class().status_code()
    }

    /// Returns the message safe to show to API clients.
    ///
    /// Internal faults never leak store text; the full `Display` output is
    /// meant for operator logs.
    pub fn client_message(&self) -> String {
        match self.class() {
            ErrorClass::Internal => "Internal Server Error".to_string(),
            ErrorClass::Conflict => match self {
                StorageError::Backend(BackendError::ConstraintViolation { kind, .. }) => {
                    format!("{kind} constraint violated")
                }
                other => other.to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Rewrites a raw constraint violation raised by a write of the given
    /// resource into the resource fault it stands for.
    ///
    /// A unique violation is always "already exists". A foreign-key violation
    /// means a referenced row is missing when writing, and that the row is
    /// still referenced when deleting. Any other violation becomes a
    /// validation fault; the store's text is only logged.
    pub fn for_resource(self, resource_type: &str, id: &str, deleting: bool) -> Self {
        match self {
            StorageError::Backend(BackendError::ConstraintViolation { kind, message }) => {
                tracing::debug!(resource_type, id, %kind, %message, "constraint violation");
                match (kind, deleting) {
                    (ConstraintKind::Unique, _) => ResourceError::AlreadyExists {
                        resource_type: resource_type.to_string(),
                        id: id.to_string(),
                    }
                    .into(),
                    (ConstraintKind::ForeignKey, true) => ResourceError::InUse {
                        resource_type: resource_type.to_string(),
                        id: id.to_string(),
                    }
                    .into(),
                    (ConstraintKind::ForeignKey, false) => ResourceError::ReferenceNotFound {
                        resource_type: resource_type.to_string(),
                        id: id.to_string(),
                    }
                    .into(),
                    (ConstraintKind::Other, _) => ValidationError::InvalidResource {
                        resource_type: resource_type.to_string(),
                        details: vec![ValidationDetail::new(id, "violates a store constraint")],
                    }
                    .into(),
                }
            }
            other => other,
        }
    }

    /// Shorthand for an internal backend fault with no source.
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: message.into(),
            source: None,
        })
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: format!("serialization error: {err}"),
            source: Some(Box::new(err)),
        })
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &err {
            if failure.code == rusqlite::ErrorCode::ConstraintViolation {
                let kind = match failure.extended_code {
                    rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => ConstraintKind::Unique,
                    rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
                    _ => ConstraintKind::Other,
                };
                return StorageError::Backend(BackendError::ConstraintViolation {
                    kind,
                    message: message.clone().unwrap_or_else(|| failure.to_string()),
                });
            }
        }

        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint(kind: ConstraintKind) -> StorageError {
        StorageError::Backend(BackendError::ConstraintViolation {
            kind,
            message: "UNIQUE constraint failed: tenant.name".to_string(),
        })
    }

    #[test]
    fn test_not_found_display() {
        let err = StorageError::Resource(ResourceError::NotFound {
            resource_type: "deliveryservice".to_string(),
            id: "42".to_string(),
        });
        assert_eq!(err.to_string(), "deliveryservice not found: 42");
        assert_eq!(err.class(), ErrorClass::NotFound);
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_parameter_errors_are_joined() {
        let err = ValidationError::InvalidParameters {
            errors: vec![
                ParameterError::new("deliveryServiceID", "must be an integer"),
                ParameterError::new("limit", "must be a non-negative integer"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "invalid value for deliveryServiceID: must be an integer; invalid value for limit: must be a non-negative integer"
        );
    }

    #[test]
    fn test_invalid_resource_display() {
        let err = ValidationError::from_details(
            "tenant",
            vec![
                ValidationDetail::new("name", "cannot be blank"),
                ValidationDetail::new("parentId", "cannot be blank"),
            ],
        )
        .unwrap();
        assert_eq!(
            err.to_string(),
            "invalid tenant: name: cannot be blank; parentId: cannot be blank"
        );
        assert!(ValidationError::from_details("tenant", vec![]).is_none());
    }

    #[test]
    fn test_error_classes() {
        let denied = StorageError::Tenant(TenantError::AccessDenied {
            user_tenant: TenantId::new(2),
            resource_tenant: TenantId::new(3),
        });
        assert_eq!(denied.class(), ErrorClass::Authorization);
        assert_eq!(denied.status_code(), 403);

        let not_impl = StorageError::Resource(ResourceError::NotImplemented {
            resource_type: "tenant".to_string(),
            operation: "update".to_string(),
        });
        assert_eq!(not_impl.status_code(), 501);
        assert!(!not_impl.class().is_client_fault());

        let internal = StorageError::internal("boom");
        assert_eq!(internal.class(), ErrorClass::Internal);
        assert_eq!(internal.client_message(), "Internal Server Error");
        assert!(internal.to_string().contains("boom"));
    }

    #[test]
    fn test_raw_constraint_is_conflict_without_store_text() {
        let err = constraint(ConstraintKind::Unique);
        assert_eq!(err.class(), ErrorClass::Conflict);
        assert_eq!(err.client_message(), "unique constraint violated");
    }

    #[test]
    fn test_for_resource_rewrites_constraints() {
        let err = constraint(ConstraintKind::Unique).for_resource("tenant", "acme", false);
        assert!(matches!(
            err,
            StorageError::Resource(ResourceError::AlreadyExists { .. })
        ));

        let err = constraint(ConstraintKind::ForeignKey).for_resource("tenant", "acme", true);
        assert!(matches!(err, StorageError::Resource(ResourceError::InUse { .. })));
        assert_eq!(err.class(), ErrorClass::Conflict);

        let err = constraint(ConstraintKind::ForeignKey).for_resource("tenant", "acme", false);
        assert!(matches!(
            err,
            StorageError::Resource(ResourceError::ReferenceNotFound { .. })
        ));
        assert_eq!(err.class(), ErrorClass::NotFound);

        let untouched = StorageError::internal("x").for_resource("tenant", "acme", false);
        assert_eq!(untouched.class(), ErrorClass::Internal);
    }

    #[test]
    fn test_check_violation_hides_store_text() {
        let err = StorageError::Backend(BackendError::ConstraintViolation {
            kind: ConstraintKind::Other,
            message: "CHECK constraint failed: length(name) > 0".to_string(),
        })
        .for_resource("tenant", "acme", false);
        assert_eq!(err.class(), ErrorClass::Validation);
        assert_eq!(
            err.client_message(),
            "invalid tenant: acme: violates a store constraint"
        );
        assert!(!err.to_string().contains("CHECK"));
    }

    #[test]
    fn test_rusqlite_constraint_classification() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT UNIQUE)")
            .unwrap();
        conn.execute("INSERT INTO t (id, name) VALUES (1, 'a')", [])
            .unwrap();
        let err: StorageError = conn
            .execute("INSERT INTO t (id, name) VALUES (2, 'a')", [])
            .unwrap_err()
            .into();
        assert!(matches!(
            err,
            StorageError::Backend(BackendError::ConstraintViolation {
                kind: ConstraintKind::Unique,
                ..
            })
        ));

        let err: StorageError = conn.execute("SELECT * FROM missing", []).unwrap_err().into();
        assert_eq!(err.class(), ErrorClass::Internal);
    }
}
