//! Error types for the reconciliation engine.
//!
//! Validation problems (`Schema`, `UnknownField`, `Profile`, `Shape`) are
//! always raised before any mutating remote call. `RemoteOperation` is the
//! only variant that can be raised after remote state has been touched, and
//! it carries the report of what was applied before the failure.

use std::fmt;

use thiserror::Error;

use crate::report::ChangeReport;

/// Errors raised while validating a desired record against its schema.
///
/// `index` is the position of the offending record in the desired list.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("config entry {index}: expected a mapping, got {found}")]
    NotAMapping { index: usize, found: String },

    #[error("config entry {index}: unsupported field '{field}'")]
    UnknownField { index: usize, field: String },

    #[error("config entry {index}: missing required field '{field}'")]
    MissingRequired { index: usize, field: String },

    #[error("config entry {index}: field '{field}' must be of type {expected}, got {found}")]
    TypeMismatch {
        index: usize,
        field: String,
        expected: String,
        found: String,
    },

    #[error("config entry {index}: value of '{field}' must be one of [{choices}], got {value}")]
    InvalidChoice {
        index: usize,
        field: String,
        value: String,
        choices: String,
    },
}

impl SchemaError {
    /// Name of the field the error refers to, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::NotAMapping { .. } => None,
            Self::UnknownField { field, .. }
            | Self::MissingRequired { field, .. }
            | Self::TypeMismatch { field, .. }
            | Self::InvalidChoice { field, .. } => Some(field),
        }
    }
}

/// Failures reported by a [`RemoteApi`](crate::remote::RemoteApi) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The remote endpoint could not be reached or authentication failed.
    #[error("connection error: {message}")]
    Connection { message: String },

    /// The remote endpoint answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("decode error: {message}")]
    Decode { message: String },
}

impl TransportError {
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// The category of remote mutation that failed during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Top-level error type of the engine.
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// The remote payload does not have a usable shape.
    #[error("invalid API response: {message}")]
    Shape { message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A field name has no entry in the field map.
    #[error("no field mapping for '{field}'")]
    UnknownField { field: String },

    /// The same local field appears twice in a field map.
    #[error("field '{field}' is mapped more than once")]
    DuplicateField { field: String },

    /// A resource profile is internally inconsistent.
    #[error("invalid resource profile '{profile}': {message}")]
    Profile { profile: String, message: String },

    #[error("failed to fetch current state: {0}")]
    Transport(#[from] TransportError),

    /// A mutating call failed; `partial` holds what was applied before it.
    #[error("{operation} failed: {source}")]
    RemoteOperation {
        operation: OperationKind,
        #[source]
        source: TransportError,
        partial: Box<ChangeReport>,
    },
}

impl ConvergeError {
    /// Create a new Shape error
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }

    /// Create a new UnknownField error
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }

    /// Create a new Profile error
    pub fn profile(profile: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Profile {
            profile: profile.into(),
            message: message.into(),
        }
    }

    /// Create a new RemoteOperation error carrying the partial report
    pub fn remote_operation(
        operation: OperationKind,
        source: TransportError,
        partial: ChangeReport,
    ) -> Self {
        Self::RemoteOperation {
            operation,
            source,
            partial: Box::new(partial),
        }
    }

    /// Report of the changes applied before the failure, if any were attempted.
    pub fn partial_report(&self) -> Option<&ChangeReport> {
        match self {
            Self::RemoteOperation { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Whether remote state is guaranteed untouched by the failed run
    pub fn is_pre_execution(&self) -> bool {
        !matches!(self, Self::RemoteOperation { .. })
    }

    /// Get error category for logging and exit reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Schema(_) | Self::UnknownField { .. } => ErrorCategory::Validation,
            Self::Shape { .. } => ErrorCategory::Shape,
            Self::Profile { .. } | Self::DuplicateField { .. } => ErrorCategory::Configuration,
            Self::Transport(_) => ErrorCategory::Transport,
            Self::RemoteOperation { .. } => ErrorCategory::Remote,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Shape,
    Transport,
    Remote,
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Shape => write!(f, "shape"),
            Self::Transport => write!(f, "transport"),
            Self::Remote => write!(f, "remote"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Convenience result type for engine operations
pub type Result<T> = std::result::Result<T, ConvergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_messages() {
        let err = SchemaError::MissingRequired {
            index: 0,
            field: "port".into(),
        };
        assert_eq!(err.to_string(), "config entry 0: missing required field 'port'");
        assert_eq!(err.field(), Some("port"));

        let err = SchemaError::NotAMapping {
            index: 2,
            found: "string".into(),
        };
        assert!(err.to_string().contains("expected a mapping"));
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_schema_error_conversion() {
        let err: ConvergeError = SchemaError::UnknownField {
            index: 1,
            field: "colour".into(),
        }
        .into();
        assert!(matches!(err, ConvergeError::Schema(_)));
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.is_pre_execution());
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: ConvergeError = TransportError::status(503, "unavailable").into();
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert_eq!(
            err.to_string(),
            "failed to fetch current state: HTTP 503: unavailable"
        );
    }

    #[test]
    fn test_remote_operation_carries_partial_report() {
        let mut partial = ChangeReport::new(true);
        partial.record_added(serde_json::json!(830));

        let err = ConvergeError::remote_operation(
            OperationKind::Update,
            TransportError::connection("reset by peer"),
            partial,
        );

        assert_eq!(err.category(), ErrorCategory::Remote);
        assert!(!err.is_pre_execution());
        assert_eq!(err.to_string(), "update failed: connection error: reset by peer");
        let report = err.partial_report().expect("partial report");
        assert!(report.changed);
        assert_eq!(report.added, vec![serde_json::json!(830)]);
    }

    #[test]
    fn test_error_categories_display() {
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::Shape.to_string(), "shape");
        assert_eq!(ErrorCategory::Transport.to_string(), "transport");
        assert_eq!(ErrorCategory::Remote.to_string(), "remote");
        assert_eq!(ErrorCategory::Configuration.to_string(), "configuration");
    }

    #[test]
    fn test_profile_error() {
        let err = ConvergeError::profile("netconf-credentials", "duplicate field 'port'");
        assert_eq!(
            err.to_string(),
            "invalid resource profile 'netconf-credentials': duplicate field 'port'"
        );
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.partial_report().is_none());
    }
}
