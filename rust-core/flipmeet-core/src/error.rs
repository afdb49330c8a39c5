//! # Error Handling
//!
//! Centralized error types for the FlipMeet core.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Every failure the core can raise is a variant of [`Error`]. Response
//! formatters never inspect messages; they branch on [`Error::kind`].

use crate::validation::ValidationErrors;
use thiserror::Error;

/// Result type alias for FlipMeet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the FlipMeet runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    Bind {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// No registered route matched the verb and path
    #[error("No route found for {method} {path}")]
    RouteNotFound {
        /// Request verb
        method: String,
        /// The path that wasn't matched
        path: String,
    },

    /// Transport method the router does not know
    #[error("Unsupported method: {method}")]
    UnsupportedMethod {
        /// Method as received
        method: String,
    },

    /// Request payload present but not a flat JSON object
    #[error("Malformed request body: {reason}")]
    MalformedBody {
        /// What was wrong with it
        reason: String,
    },

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes, received={actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Actual size
        actual: usize,
    },

    /// Single-row lookup found nothing
    #[error("Record not found in {table}: {key}")]
    RecordNotFound {
        /// Table that was searched
        table: &'static str,
        /// Lookup key as text
        key: String,
    },

    /// Statement execution or connection failure
    #[error("Data access error: {message}")]
    DataAccess {
        /// Error message from the driver
        message: String,
    },

    /// Value could not be coerced into an entity field
    #[error("Invalid value for {field}: expected {expected}")]
    InvalidValue {
        /// Field being set
        field: String,
        /// Expected shape
        expected: &'static str,
    },

    /// Input failed one or more validation rules
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(ValidationErrors),

    /// A guard refused to let the request proceed
    #[error("Unauthorized: {message}")]
    Authorization {
        /// Reason for the refusal
        message: String,
    },

    /// Request conflicts with existing state (duplicate key)
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflict
        message: String,
    },

    /// Write attempted through the property boundary on a field with a setter
    #[error("Property {field} of {table} is read-only")]
    ImmutableProperty {
        /// Entity table
        table: &'static str,
        /// Field name
        field: String,
    },

    /// Field has no accessor at all
    #[error("Property {field} does not exist on {table}")]
    UnknownProperty {
        /// Entity table
        table: &'static str,
        /// Field name
        field: String,
    },

    /// Programmer or deployment error: unknown rule, unresolvable handler, bad setting
    #[error("Configuration error: {message}")]
    Configuration {
        /// What is misconfigured
        message: String,
    },

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`] for response mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input failed validation
    Validation,
    /// Route or record not found
    NotFound,
    /// Guard refused the request
    AccessDenied,
    /// Duplicate or conflicting state
    Conflict,
    /// Request could not be understood
    BadRequest,
    /// Method not supported
    MethodNotAllowed,
    /// Body over the configured limit
    PayloadTooLarge,
    /// Storage failure
    DataAccess,
    /// Misconfiguration
    Configuration,
    /// Misuse of the entity property boundary
    PropertyAccess,
    /// Socket, protocol or serialization failure
    Transport,
}

impl ErrorKind {
    /// Whether a caller is expected to recover from this kind
    #[must_use]
    pub const fn is_expected(self) -> bool {
        matches!(
            self,
            Self::Validation
                | Self::NotFound
                | Self::AccessDenied
                | Self::Conflict
                | Self::BadRequest
                | Self::MethodNotAllowed
                | Self::PayloadTooLarge
        )
    }
}

impl Error {
    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::RouteNotFound { .. } | Self::RecordNotFound { .. } => ErrorKind::NotFound,
            Self::Authorization { .. } => ErrorKind::AccessDenied,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::MalformedBody { .. } | Self::InvalidValue { .. } => ErrorKind::BadRequest,
            Self::UnsupportedMethod { .. } => ErrorKind::MethodNotAllowed,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::DataAccess { .. } => ErrorKind::DataAccess,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::ImmutableProperty { .. } | Self::UnknownProperty { .. } => {
                ErrorKind::PropertyAccess
            }
            Self::Bind { .. } | Self::Http(_) | Self::Json(_) | Self::Io(_) => ErrorKind::Transport,
        }
    }

    /// Shorthand for a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for an authorization error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }
}
