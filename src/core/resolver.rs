//! Resolution orchestrator.
//!
//! One pass: snapshot, classify, read each kind from the cache or fetch it,
//! merge, apply, report.
//!
//! Override order when several sources produce the same variable: the
//! grouped directive is applied first on its own, then direct parameter
//! values, then Secrets Manager values, so the last one wins.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::core::backend::{AwsBackends, Backends, ParameterBackend};
use crate::core::cache::Cache;
use crate::core::config::Settings;
use crate::core::dotenv;
use crate::core::env::{EnvSink, ProcessEnv};
use crate::core::fetch::{decode_secret_variables, ParameterFetcher, SecretFetcher};
use crate::core::reference::{classify, BackendKind, Reference};
use crate::core::report::{Reporter, Stderr};
use crate::core::store::{BlobStore, CacheKey, Filesystem};
use crate::error::{Error, Missing, Result};

/// Outcome of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Names of every variable assigned, sorted
    pub variables: Vec<String>,
    /// Kinds that called their backend instead of reading the cache
    pub fetched: Vec<BackendKind>,
}

impl Resolution {
    /// Whether any backend was called live.
    pub fn fetched_any(&self) -> bool {
        !self.fetched.is_empty()
    }
}

/// Resolves secret references in an environment.
pub struct Resolver {
    settings: Settings,
    sink: Box<dyn EnvSink>,
    cache: Cache,
    backends: Box<dyn Backends>,
    reporter: Box<dyn Reporter>,
}

impl Resolver {
    /// Create a resolver from explicit collaborators.
    ///
    /// Reports go to stderr unless replaced with [`Resolver::with_reporter`].
    pub fn new(
        settings: Settings,
        sink: impl EnvSink + 'static,
        store: impl BlobStore + 'static,
        backends: impl Backends + 'static,
    ) -> Self {
        Self {
            settings,
            sink: Box::new(sink),
            cache: Cache::new(store),
            backends: Box::new(backends),
            reporter: Box::new(Stderr),
        }
    }

    /// Resolver over the process environment, filesystem cache and AWS.
    pub fn from_env() -> Self {
        let settings = Settings::from_snapshot(&ProcessEnv.snapshot());
        let store = Filesystem::from_settings(&settings);
        let backends = AwsBackends::from_settings(&settings);
        Self::new(settings, ProcessEnv, store, backends)
    }

    /// Replace where the post-fetch report goes.
    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one resolution pass.
    ///
    /// # Errors
    ///
    /// Any backend, cache or payload error. Values applied by an earlier
    /// step (the grouped directive) stay applied when a later step fails.
    pub fn resolve(&self) -> Result<Resolution> {
        let snapshot = self.sink.snapshot();
        let refs = classify(&snapshot, &self.settings);

        if refs.is_empty() {
            debug!("no references found");
            return Ok(Resolution::default());
        }

        // Refuse before any backend call if a kind cannot be served.
        if !refs.secrets.is_empty() {
            self.backends.check_secrets()?;
        }
        if !refs.parameters.is_empty() || refs.parameter_store.is_some() {
            self.backends.check_parameters()?;
        }

        let mut parameter_backend = None;
        let mut fetched = Vec::new();
        let mut variables = BTreeSet::new();

        if let Some(directive) = &refs.parameter_store {
            let cached = self.cache.read_or_compute_from(
                CacheKey::ParameterStore,
                &directive.identifier,
                || {
                    let backend = self.parameter_backend(&mut parameter_backend)?;
                    fetch_parameter_store(backend, directive)
                },
            )?;
            if cached.fetched {
                fetched.push(BackendKind::GroupedParameter);
            }
            if let Some(source) = cached
                .source
                .as_deref()
                .filter(|source| *source != directive.identifier)
            {
                warn!(
                    cached = %source,
                    requested = %directive.identifier,
                    "grouped cache entry was expanded from another parameter, delete it to refetch"
                );
            }
            self.sink.set_all(&cached.values)?;
            variables.extend(cached.values.into_keys());
        }

        let mut merged = BTreeMap::new();

        if !refs.parameters.is_empty() {
            let identifiers = identifier_set(&refs.parameters);
            let cached = self.cache.read_or_compute(CacheKey::Parameters, || {
                let backend = self.parameter_backend(&mut parameter_backend)?;
                ParameterFetcher::new(backend).fetch(&identifiers)
            })?;
            if cached.fetched {
                fetched.push(BackendKind::DirectParameter);
            }
            merged.extend(assign_parameters(&refs.parameters, &cached.values)?);
        }

        if !refs.secrets.is_empty() {
            let identifiers = identifier_set(&refs.secrets);
            // Payloads are decoded before they are cached, so a malformed
            // secret never reaches disk.
            let mut decoded = None;
            let cached = self.cache.read_or_compute(CacheKey::Secrets, || {
                let backend = self.backends.secrets()?;
                let payloads = SecretFetcher::new(backend.as_ref()).fetch(&identifiers)?;
                decoded = Some(decode_secret_variables(&identifiers, &payloads)?);
                Ok(payloads)
            })?;
            if cached.fetched {
                fetched.push(BackendKind::DirectSecret);
            }
            let vars = match decoded {
                Some(vars) => vars,
                None => decode_secret_variables(&identifiers, &cached.values)?,
            };
            merged.extend(vars);
        }

        if !merged.is_empty() {
            self.sink.set_all(&merged)?;
        }
        variables.extend(merged.into_keys());

        let resolution = Resolution {
            variables: variables.into_iter().collect(),
            fetched,
        };

        if resolution.fetched_any() {
            info!(
                variables = resolution.variables.len(),
                "resolved environment variables from AWS"
            );
            self.reporter.report(&resolution.variables);
        } else {
            debug!(
                variables = resolution.variables.len(),
                "resolved environment variables from cache"
            );
        }

        Ok(resolution)
    }

    /// Build the parameter client at most once per pass.
    fn parameter_backend<'a>(
        &self,
        slot: &'a mut Option<Box<dyn ParameterBackend>>,
    ) -> Result<&'a dyn ParameterBackend> {
        let backend = match slot.take() {
            Some(backend) => backend,
            None => self.backends.parameters()?,
        };
        Ok(&**slot.insert(backend))
    }
}

fn identifier_set(refs: &[Reference]) -> BTreeSet<String> {
    refs.iter().map(|r| r.identifier.clone()).collect()
}

/// Fetch the grouped parameter and expand its `KEY=VALUE` payload.
fn fetch_parameter_store(
    backend: &dyn ParameterBackend,
    directive: &Reference,
) -> Result<BTreeMap<String, String>> {
    let wanted = BTreeSet::from([directive.identifier.clone()]);
    let mut values = ParameterFetcher::new(backend).fetch(&wanted)?;

    let payload = values
        .remove(&directive.identifier)
        .map(Zeroizing::new)
        .ok_or_else(|| Error::NotFound {
            backend: "ssm",
            missing: vec![Missing::new(directive.identifier.clone())],
        })?;

    dotenv::parse(&payload).map_err(|e| Error::MalformedPayload {
        identifier: directive.identifier.clone(),
        reason: e.to_string(),
    })
}

/// Map each parameter reference's variable to its identifier's value.
///
/// A cache entry written for a different set of references may lack some
/// identifiers; those are reported as missing rather than skipped.
fn assign_parameters(
    refs: &[Reference],
    values: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let mut assigned = BTreeMap::new();
    let mut missing = BTreeSet::new();

    for reference in refs {
        match values.get(&reference.identifier) {
            Some(value) => {
                assigned.insert(reference.variable.clone(), value.clone());
            }
            None => {
                missing.insert(reference.identifier.clone());
            }
        }
    }

    if !missing.is_empty() {
        return Err(Error::NotFound {
            backend: "ssm",
            missing: missing
                .into_iter()
                .map(|id| Missing::with_reason(id, "absent from cache entry"))
                .collect(),
        });
    }

    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::{BackendError, ParameterBatch, SecretBackend};
    use crate::core::env::MemorySink;
    use crate::core::report::Silent;
    use tempfile::TempDir;

    /// Serves every parameter as `value-of:<name>` and every secret as
    /// `{"FROM_SECRET":"<id>"}`; secrets are unavailable when `secrets` is false.
    struct Echo {
        secrets: bool,
    }

    struct EchoParameters;

    impl ParameterBackend for EchoParameters {
        fn get_parameters(
            &self,
            names: &[String],
        ) -> std::result::Result<ParameterBatch, BackendError> {
            Ok(ParameterBatch {
                found: names
                    .iter()
                    .map(|n| (n.clone(), format!("value-of:{}", n)))
                    .collect(),
                not_found: Vec::new(),
            })
        }
    }

    struct EchoSecrets;

    impl SecretBackend for EchoSecrets {
        fn get_secret_string(&self, id: &str) -> std::result::Result<String, BackendError> {
            Ok(format!(r#"{{"FROM_SECRET":"{}"}}"#, id))
        }
    }

    impl Backends for Echo {
        fn check_secrets(&self) -> Result<()> {
            if self.secrets {
                Ok(())
            } else {
                Err(crate::error::ConfigError::BackendUnavailable {
                    backend: "secretsmanager",
                    feature: "secretsmanager",
                }
                .into())
            }
        }

        fn parameters(&self) -> Result<Box<dyn ParameterBackend>> {
            Ok(Box::new(EchoParameters))
        }

        fn secrets(&self) -> Result<Box<dyn SecretBackend>> {
            self.check_secrets()?;
            Ok(Box::new(EchoSecrets))
        }
    }

    fn resolver(tmp: &TempDir, sink: &MemorySink, secrets: bool) -> Resolver {
        let settings = Settings::default().with_cache_dir(tmp.path());
        let store = Filesystem::from_settings(&settings);
        Resolver::new(settings, sink.clone(), store, Echo { secrets }).with_reporter(Silent)
    }

    #[test]
    fn test_no_references_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let sink = MemorySink::from_pairs([("PATH", "/usr/bin")]);

        let resolution = resolver(&tmp, &sink, true).resolve().unwrap();

        assert_eq!(resolution, Resolution::default());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_resolves_parameter_reference() {
        let tmp = TempDir::new().unwrap();
        let sink = MemorySink::from_pairs([("DB", "coldstart-ssm:/app/db")]);

        let resolution = resolver(&tmp, &sink, true).resolve().unwrap();

        assert_eq!(sink.get("DB").as_deref(), Some("value-of:/app/db"));
        assert_eq!(resolution.variables, vec!["DB".to_string()]);
        assert_eq!(resolution.fetched, vec![BackendKind::DirectParameter]);
    }

    #[test]
    fn test_missing_secret_support_fails_before_any_call() {
        let tmp = TempDir::new().unwrap();
        let sink = MemorySink::from_pairs([
            ("DB", "coldstart-ssm:/app/db"),
            ("APP", "coldstart-secretsmanager:prod/app"),
        ]);

        let err = resolver(&tmp, &sink, false).resolve().unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert_eq!(sink.get("DB").as_deref(), Some("coldstart-ssm:/app/db"));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_assign_parameters_reports_stale_cache() {
        let refs = vec![Reference {
            variable: "DB".to_string(),
            kind: BackendKind::DirectParameter,
            identifier: "/app/new".to_string(),
        }];
        let err = assign_parameters(&refs, &BTreeMap::new()).unwrap_err();
        assert_eq!(err.missing_identifiers(), vec!["/app/new"]);
    }
}
