//! Error types for table declarations and field resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by user-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors while loading or validating a table declaration.
///
/// A malformed declaration fails here, at construction time; it is
/// never deferred to resolution.
#[derive(Debug, Error)]
pub enum SchemaError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Declaration errors (exit code 2)
    #[error("invalid declaration: {} violation(s)", violations.len())]
    InvalidDeclaration { violations: Vec<Violation> },

    #[error("invalid field at {path}: {message}")]
    InvalidField { path: String, message: String },
}

/// Single declaration violation with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Violation {
    /// JSON Pointer (RFC 6901) to the offending value.
    pub path: String,
    /// Human-readable description.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl SchemaError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SchemaError::FileNotFound { .. } | SchemaError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            SchemaError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors raised while resolving fields against a row.
///
/// Callback failures are never swallowed or replaced with a blank
/// value; silently degrading would mask a defect in a display rule,
/// and treating an authorization failure as allow or deny would be a
/// silent security decision.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("authorization check failed for field \"{field}\": {source}")]
    Authorization {
        field: String,
        #[source]
        source: BoxError,
    },

    #[error("computed callback failed for field \"{field}\": {source}")]
    Computed {
        field: String,
        #[source]
        source: BoxError,
    },

    #[error("transform failed for field \"{field}\": {source}")]
    Transform {
        field: String,
        #[source]
        source: BoxError,
    },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }

    /// Name of the field the failure is attributed to.
    pub fn field(&self) -> &str {
        match self {
            ResolveError::Authorization { field, .. }
            | ResolveError::Computed { field, .. }
            | ResolveError::Transform { field, .. } => field,
        }
    }
}
