//! Reference classification.
//!
//! Scans a snapshot and tags each value that points at a backend.

use tracing::{debug, warn};

use crate::core::config::Settings;
use crate::core::env::Snapshot;

/// Backend a reference resolves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    /// One variable, one SSM parameter
    DirectParameter,
    /// One Secrets Manager secret holding a JSON object of variables
    DirectSecret,
    /// One SSM parameter holding `KEY=VALUE` lines
    GroupedParameter,
}

impl BackendKind {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DirectParameter => "ssm",
            Self::DirectSecret => "secretsmanager",
            Self::GroupedParameter => "ssm-env",
        }
    }
}

/// A classified environment entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Variable holding the reference
    pub variable: String,
    pub kind: BackendKind,
    /// Backend identifier with its prefix stripped
    pub identifier: String,
}

/// References found in one snapshot, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    pub parameters: Vec<Reference>,
    pub secrets: Vec<Reference>,
    pub parameter_store: Option<Reference>,
}

impl References {
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.secrets.is_empty() && self.parameter_store.is_none()
    }

    pub fn len(&self) -> usize {
        self.parameters.len() + self.secrets.len() + usize::from(self.parameter_store.is_some())
    }
}

/// Partition a snapshot into references.
///
/// Prefix checks are literal and case-sensitive. The well-known grouped
/// variable is checked for the grouped prefix first; every other variable
/// (and the grouped variable when its prefix does not match) is checked for
/// the parameter prefix, then the secret prefix. A reference with nothing
/// after its prefix is left untouched.
pub fn classify(snapshot: &Snapshot, settings: &Settings) -> References {
    let mut refs = References::default();

    for (variable, value) in snapshot.iter() {
        let reference = if variable == settings.parameter_store_variable {
            value
                .strip_prefix(settings.parameter_store_prefix.as_str())
                .map(|id| (BackendKind::GroupedParameter, id))
        } else {
            None
        }
        .or_else(|| {
            value
                .strip_prefix(settings.parameter_prefix.as_str())
                .map(|id| (BackendKind::DirectParameter, id))
        })
        .or_else(|| {
            value
                .strip_prefix(settings.secret_prefix.as_str())
                .map(|id| (BackendKind::DirectSecret, id))
        });

        let Some((kind, identifier)) = reference else {
            continue;
        };

        if identifier.is_empty() {
            warn!(variable = %variable, kind = kind.name(), "reference has no identifier, leaving it untouched");
            continue;
        }

        let reference = Reference {
            variable: variable.to_string(),
            kind,
            identifier: identifier.to_string(),
        };

        match kind {
            BackendKind::DirectParameter => refs.parameters.push(reference),
            BackendKind::DirectSecret => refs.secrets.push(reference),
            BackendKind::GroupedParameter => refs.parameter_store = Some(reference),
        }
    }

    debug!(
        parameters = refs.parameters.len(),
        secrets = refs.secrets.len(),
        parameter_store = refs.parameter_store.is_some(),
        "classified environment"
    );

    refs
}
