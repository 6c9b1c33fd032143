//! Backend fetchers.
//!
//! Turn a set of identifiers into a complete identifier-to-value map, or
//! fail. Partial results are never returned.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::core::backend::{BackendError, ParameterBackend, SecretBackend};
use crate::core::constants::PARAMETER_BATCH_SIZE;
use crate::core::env::check_variable;
use crate::error::{Error, Missing, Result};

const SSM: &str = "ssm";
const SECRETS_MANAGER: &str = "secretsmanager";

/// Fetches parameters in batches of [`PARAMETER_BATCH_SIZE`].
pub struct ParameterFetcher<'a> {
    backend: &'a dyn ParameterBackend,
}

impl<'a> ParameterFetcher<'a> {
    pub fn new(backend: &'a dyn ParameterBackend) -> Self {
        Self { backend }
    }

    /// Fetch every identifier in `identifiers`.
    ///
    /// All batches run even after one reports missing parameters, so the
    /// resulting error lists every missing identifier at once.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` listing every identifier the backend did not return
    /// - `Error::PermissionDenied` when the backend refuses a batch
    /// - `Error::Backend` for any other failure
    pub fn fetch(&self, identifiers: &BTreeSet<String>) -> Result<BTreeMap<String, String>> {
        let names: Vec<String> = identifiers.iter().cloned().collect();
        let mut found = BTreeMap::new();
        let mut missing = BTreeSet::new();

        info!(count = names.len(), "fetching parameters from ssm");

        for batch in names.chunks(PARAMETER_BATCH_SIZE) {
            debug!(size = batch.len(), "requesting parameter batch");
            let result = self.backend.get_parameters(batch).map_err(parameter_error)?;

            missing.extend(result.not_found);
            for name in batch {
                match result.found.get(name) {
                    Some(value) => {
                        found.insert(name.clone(), value.clone());
                    }
                    None => {
                        missing.insert(name.clone());
                    }
                }
            }
        }

        if !missing.is_empty() {
            return Err(Error::NotFound {
                backend: SSM,
                missing: missing.into_iter().map(Missing::new).collect(),
            });
        }

        Ok(found)
    }
}

fn parameter_error(err: BackendError) -> Error {
    match err {
        BackendError::PermissionDenied { status, message } => Error::PermissionDenied {
            backend: SSM,
            status,
            message,
        },
        BackendError::NotFound(message) | BackendError::Other { message, .. } => Error::Backend {
            backend: SSM,
            message,
        },
    }
}

/// Fetches secrets one at a time.
pub struct SecretFetcher<'a> {
    backend: &'a dyn SecretBackend,
}

impl<'a> SecretFetcher<'a> {
    pub fn new(backend: &'a dyn SecretBackend) -> Self {
        Self { backend }
    }

    /// Fetch the raw string payload of every identifier.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` listing each failed identifier with its error
    /// message, whatever the kind of failure.
    pub fn fetch(&self, identifiers: &BTreeSet<String>) -> Result<BTreeMap<String, String>> {
        let mut found = BTreeMap::new();
        let mut failed = Vec::new();

        info!(count = identifiers.len(), "fetching secrets from secretsmanager");

        for id in identifiers {
            match self.backend.get_secret_string(id) {
                Ok(payload) => {
                    found.insert(id.clone(), payload);
                }
                Err(e) => {
                    debug!(secret_id = %id, error = %e, "secret fetch failed");
                    failed.push(Missing::with_reason(id.clone(), e.to_string()));
                }
            }
        }

        if !failed.is_empty() {
            return Err(Error::NotFound {
                backend: SECRETS_MANAGER,
                missing: failed,
            });
        }

        Ok(found)
    }
}

/// Decode a secret payload (a JSON object) into variable assignments.
///
/// String values are taken as is; numbers and booleans are stringified.
///
/// # Errors
///
/// `Error::MalformedPayload` if the payload is not a JSON object, holds a
/// null, array or nested object value, or has a key or value the process
/// environment cannot hold (see [`check_variable`]).
pub fn decode_secret_payload(identifier: &str, payload: &str) -> Result<BTreeMap<String, String>> {
    let malformed = |reason: String| Error::MalformedPayload {
        identifier: identifier.to_string(),
        reason,
    };

    let value: Value = serde_json::from_str(payload)
        .map_err(|e| malformed(format!("invalid JSON: {}", e)))?;
    let Value::Object(object) = value else {
        return Err(malformed("expected a JSON object".to_string()));
    };

    object
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(malformed(format!(
                        "value of {} is not a string, number or boolean ({})",
                        key,
                        json_type(&other)
                    )))
                }
            };
            check_variable(&key, &value)
                .map_err(|reason| malformed(format!("key {:?}: {}", key, reason)))?;
            Ok((key, value))
        })
        .collect()
}

/// Decode the payloads of `identifiers` into one variable map.
///
/// Payloads are merged in identifier order, so when two secrets define the
/// same key the one with the greater identifier wins. `payloads` may come
/// from a cache entry written for a different set of references.
///
/// # Errors
///
/// `Error::NotFound` listing every identifier absent from `payloads`, or
/// `Error::MalformedPayload` from [`decode_secret_payload`].
pub fn decode_secret_variables(
    identifiers: &BTreeSet<String>,
    payloads: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let missing: Vec<Missing> = identifiers
        .iter()
        .filter(|id| !payloads.contains_key(*id))
        .map(|id| Missing::with_reason(id.clone(), "absent from cache entry"))
        .collect();
    if !missing.is_empty() {
        return Err(Error::NotFound {
            backend: SECRETS_MANAGER,
            missing,
        });
    }

    let mut vars = BTreeMap::new();
    for id in identifiers {
        if let Some(payload) = payloads.get(id) {
            let payload = Zeroizing::new(payload.clone());
            vars.extend(decode_secret_payload(id, &payload)?);
        }
    }

    Ok(vars)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
    }
}
