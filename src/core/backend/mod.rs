//! Remote secret stores.
//!
//! Two narrow capabilities, one per backend kind, plus a factory that builds
//! them on demand. The resolver only asks the factory for a client after a
//! cache miss, so a warm start never loads AWS configuration.
//!
//! ## Backends
//!
//! - **SSM Parameter Store**: Feature-gated (`ssm`). Bulk `GetParameters`.
//! - **Secrets Manager**: Feature-gated (`secretsmanager`). One
//!   `GetSecretValue` per secret.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::config::Settings;
use crate::error::{ConfigError, Result};

#[cfg(feature = "ssm")]
pub mod ssm;

#[cfg(feature = "secretsmanager")]
pub mod secretsmanager;

#[cfg(any(feature = "ssm", feature = "secretsmanager"))]
mod runtime;

/// Error codes AWS uses for credential and authorization failures.
const PERMISSION_CODES: &[&str] = &[
    "AccessDeniedException",
    "AccessDenied",
    "UnrecognizedClientException",
    "InvalidClientTokenId",
    "InvalidSignatureException",
    "SignatureDoesNotMatch",
    "MissingAuthenticationTokenException",
    "ExpiredTokenException",
    "KMSAccessDeniedException",
];

/// Error codes AWS uses for missing entries.
const NOT_FOUND_CODES: &[&str] = &["ParameterNotFound", "ResourceNotFoundException"];

/// A backend call failure, tagged once at the client boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    PermissionDenied { status: Option<u16>, message: String },

    #[error("{message}")]
    Other { status: Option<u16>, message: String },
}

impl BackendError {
    /// Tag a failed call from its HTTP status and service error code.
    ///
    /// The code decides when there is one: authorization codes are
    /// permission failures and every other code (`ValidationException`,
    /// `DecryptionFailure`, throttling) is not. A 403 is always a permission
    /// failure. A 400 without a code is treated as one too.
    pub fn classify(status: Option<u16>, code: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();

        match code {
            Some(code) if NOT_FOUND_CODES.contains(&code) => Self::NotFound(message),
            Some(code) if PERMISSION_CODES.contains(&code) => {
                Self::PermissionDenied { status, message }
            }
            _ if status == Some(403) => Self::PermissionDenied { status, message },
            Some(_) => Self::Other { status, message },
            None if status == Some(400) => Self::PermissionDenied { status, message },
            None => Self::Other { status, message },
        }
    }
}

/// Result of one `GetParameters` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterBatch {
    pub found: BTreeMap<String, String>,
    pub not_found: Vec<String>,
}

/// Bulk key/value backend (SSM Parameter Store).
pub trait ParameterBackend {
    /// Fetch at most [`PARAMETER_BATCH_SIZE`](crate::core::constants::PARAMETER_BATCH_SIZE)
    /// decrypted parameters in one call.
    fn get_parameters(&self, names: &[String]) -> std::result::Result<ParameterBatch, BackendError>;
}

/// Single secret-string backend (Secrets Manager).
pub trait SecretBackend {
    /// Fetch one secret's string payload.
    fn get_secret_string(&self, id: &str) -> std::result::Result<String, BackendError>;
}

/// Builds backend clients on demand.
pub trait Backends {
    /// Fail fast if parameter references cannot be served by this build.
    fn check_parameters(&self) -> Result<()> {
        Ok(())
    }

    /// Fail fast if secret references cannot be served by this build.
    fn check_secrets(&self) -> Result<()> {
        Ok(())
    }

    fn parameters(&self) -> Result<Box<dyn ParameterBackend>>;

    fn secrets(&self) -> Result<Box<dyn SecretBackend>>;
}

/// AWS clients built from the default provider chain.
///
/// Each client is only compiled in with its cargo feature; without it the
/// matching `check_*` method returns `ConfigError::BackendUnavailable`.
#[derive(Debug, Clone, Default)]
pub struct AwsBackends {
    region: Option<String>,
}

impl AwsBackends {
    pub fn new(region: Option<String>) -> Self {
        Self { region }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.region.clone())
    }
}

impl Backends for AwsBackends {
    fn check_parameters(&self) -> Result<()> {
        if cfg!(feature = "ssm") {
            Ok(())
        } else {
            Err(unavailable("ssm"))
        }
    }

    fn check_secrets(&self) -> Result<()> {
        if cfg!(feature = "secretsmanager") {
            Ok(())
        } else {
            Err(unavailable("secretsmanager"))
        }
    }

    fn parameters(&self) -> Result<Box<dyn ParameterBackend>> {
        #[cfg(feature = "ssm")]
        {
            Ok(Box::new(ssm::Ssm::connect(self.region.clone())?))
        }
        #[cfg(not(feature = "ssm"))]
        {
            let _ = &self.region;
            Err(unavailable("ssm"))
        }
    }

    fn secrets(&self) -> Result<Box<dyn SecretBackend>> {
        #[cfg(feature = "secretsmanager")]
        {
            Ok(Box::new(secretsmanager::SecretsManager::connect(
                self.region.clone(),
            )?))
        }
        #[cfg(not(feature = "secretsmanager"))]
        {
            let _ = &self.region;
            Err(unavailable("secretsmanager"))
        }
    }
}

// Backend names double as their cargo feature names.
fn unavailable(backend: &'static str) -> crate::error::Error {
    ConfigError::BackendUnavailable {
        backend,
        feature: backend,
    }
    .into()
}
