//! Error types for secret resolution.
//!
//! Every failure surfaces to the caller of [`crate::resolve`]; nothing is
//! retried and nothing is silently skipped.

use std::fmt;

use thiserror::Error;

/// Remediation phrase included in every permission error.
pub const PERMISSION_REMEDIATION: &str =
    "grant the execution role read access to the referenced entries";

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// A backend is unavailable or could not be constructed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// One or more requested identifiers do not exist in the backend.
    #[error("{backend}: could not resolve {}", format_missing(.missing))]
    NotFound {
        backend: &'static str,
        missing: Vec<Missing>,
    },

    /// The backend refused the request.
    #[error(
        "{backend}: access denied while resolving environment variables, {remediation}. \
         Full error message (status {}): {message}",
        format_status(.status),
        remediation = PERMISSION_REMEDIATION
    )]
    PermissionDenied {
        backend: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// Any other backend failure.
    #[error("{backend}: request failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    /// An existing cache entry could not be parsed.
    #[error("malformed cache entry at {path}: {reason} (delete the file to refetch)")]
    MalformedCache { path: String, reason: String },

    /// A fetched payload does not have the expected key/value shape.
    #[error("malformed payload in {identifier}: {reason}")]
    MalformedPayload { identifier: String, reason: String },

    /// A variable cannot be held by the environment.
    #[error("cannot set environment variable {name:?}: {reason}")]
    InvalidVariable { name: String, reason: &'static str },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Backend availability errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "{backend} references found but {backend} support is not compiled in. \
         Rebuild with: --features {feature}"
    )]
    BackendUnavailable {
        backend: &'static str,
        feature: &'static str,
    },

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Cache byte store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// An identifier the backend could not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Missing {
    pub identifier: String,
    /// Underlying error message, when the backend gave one.
    pub reason: Option<String>,
}

impl Missing {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            reason: None,
        }
    }

    pub fn with_reason(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            reason: Some(reason.into()),
        }
    }
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{} ({})", self.identifier, reason),
            None => write!(f, "{}", self.identifier),
        }
    }
}

fn format_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "unknown".to_string(), |s| s.to_string())
}

fn format_missing(missing: &[Missing]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Identifiers listed by a `NotFound` error, empty for other variants.
    pub fn missing_identifiers(&self) -> Vec<&str> {
        match self {
            Self::NotFound { missing, .. } => {
                missing.iter().map(|m| m.identifier.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
