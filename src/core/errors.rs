//! Error types for the claimaudit-rs library.
//!
//! Errors are split by blast radius. [`NormalizationError`] is per-claim and never
//! escapes the claim it belongs to; [`AuditError`] covers session-level and
//! engine-level failures (bad configuration, vanished baseline snapshots, I/O).

use std::io;

use thiserror::Error;

/// Main result type for claimaudit operations.
pub type Result<T> = std::result::Result<T, AuditError>;

/// Failure to turn a raw claim record into a canonical [`crate::core::claim::Claim`].
///
/// Every variant names the offending field so the ingestion failure can be reported
/// back to whoever supplied the record.
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationError {
    /// A required field is absent, null, or blank
    #[error("missing required field '{field}'")]
    MissingField {
        /// Field name as it appears in the raw record
        field: String,
    },

    /// A field is present but cannot be coerced to the expected type
    #[error("field '{field}' has invalid type: expected {expected}, got {actual}")]
    InvalidType {
        /// Field name
        field: String,
        /// Expected type or format
        expected: String,
        /// What was actually found
        actual: String,
    },

    /// A field parsed but violates a domain constraint
    #[error("field '{field}' is out of range: {message}")]
    OutOfRange {
        /// Field name
        field: String,
        /// Which constraint was violated
        message: String,
    },
}

impl NormalizationError {
    /// Create a missing-field error
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an invalid-type error
    pub fn invalid_type(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidType {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an out-of-range error
    pub fn out_of_range(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OutOfRange {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Name of the field that failed normalization
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field }
            | Self::InvalidType { field, .. }
            | Self::OutOfRange { field, .. } => field,
        }
    }
}

/// Comprehensive error type for all claimaudit operations.
#[derive(Error, Debug)]
pub enum AuditError {
    /// I/O related errors (claim files, baseline artifacts, reports)
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Invalid engine configuration. Always raised before any claim is processed.
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration field that caused the error
        field: Option<String>,
    },

    /// A single claim record could not be normalized
    #[error("Normalization error: {0}")]
    Normalization(#[from] NormalizationError),

    /// No anomaly model is loaded
    #[error("Anomaly model unavailable: {reason}")]
    ModelUnavailable {
        /// Why the model could not be used
        reason: String,
    },

    /// The baseline snapshot pinned by a running session is no longer available
    #[error("Baseline snapshot version {pinned} is no longer available: {reason}")]
    SnapshotVersionMismatch {
        /// Version the session pinned at start
        pinned: u64,
        /// Description of what went wrong
        reason: String,
    },

    /// A requested baseline snapshot version does not exist
    #[error("Baseline snapshot not found: {version}")]
    SnapshotNotFound {
        /// Requested version (`latest` when none was requested)
        version: String,
    },

    /// Unknown audit session
    #[error("Audit session not found: {session_id}")]
    SessionNotFound {
        /// Requested session id
        session_id: String,
    },

    /// Illegal session state transition
    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Data type being serialized
        data_type: Option<String>,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors for input data and artifacts
    #[error("Validation error: {message}")]
    Validation {
        /// Error description
        message: String,
        /// Field or input that failed validation
        field: Option<String>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
        /// Additional context
        context: Option<String>,
    },
}

impl AuditError {
    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a model-unavailable error
    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a snapshot mismatch error for a pinned version
    pub fn snapshot_mismatch(pinned: u64, reason: impl Into<String>) -> Self {
        Self::SnapshotVersionMismatch {
            pinned,
            reason: reason.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new validation error with field context
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: None,
        }
    }

    /// Add context to an existing error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        match &mut self {
            Self::Internal { context: ctx, .. } => {
                *ctx = Some(context.into());
            }
            Self::Io { message, .. }
            | Self::Config { message, .. }
            | Self::Validation { message, .. }
            | Self::Serialization { message, .. } => {
                *message = format!("{}: {}", context.into(), message);
            }
            _ => {}
        }
        self
    }
}

impl From<io::Error> for AuditError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            data_type: Some("JSON".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for AuditError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML serialization failed: {err}"),
            data_type: Some("YAML".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<csv::Error> for AuditError {
    fn from(err: csv::Error) -> Self {
        Self::Serialization {
            message: format!("CSV parsing failed: {err}"),
            data_type: Some("CSV".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

/// Result extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error result
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<AuditError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }

    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| e.into().with_context(msg))
    }
}
