//! In-memory backends and reporter.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use coldstart::core::backend::{
    BackendError, Backends, ParameterBackend, ParameterBatch, SecretBackend,
};
use coldstart::core::report::Reporter;
use coldstart::error::{ConfigError, Result};

#[derive(Debug, Default)]
struct State {
    parameters: BTreeMap<String, String>,
    secrets: BTreeMap<String, String>,
    denied: Option<BackendError>,
    secrets_unavailable: bool,
    parameter_calls: Vec<Vec<String>>,
    secret_calls: Vec<String>,
    clients_built: usize,
}

/// Fake AWS account. Clones share state, so a test can keep a handle while
/// the resolver owns another.
#[derive(Debug, Default, Clone)]
pub struct FakeAws {
    state: Arc<Mutex<State>>,
}

impl FakeAws {
    pub fn parameter(self, name: &str, value: &str) -> Self {
        self.with(|s| {
            s.parameters.insert(name.to_string(), value.to_string());
        })
    }

    pub fn secret(self, id: &str, payload: &str) -> Self {
        self.with(|s| {
            s.secrets.insert(id.to_string(), payload.to_string());
        })
    }

    /// Make every parameter call fail with `error`.
    pub fn deny_parameters(self, error: BackendError) -> Self {
        self.with(|s| s.denied = Some(error))
    }

    /// Behave like a build without Secrets Manager support.
    pub fn without_secrets_support(self) -> Self {
        self.with(|s| s.secrets_unavailable = true)
    }

    /// Every `GetParameters` call, in order.
    pub fn parameter_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().parameter_calls.clone()
    }

    /// Every `GetSecretValue` call, in order.
    pub fn secret_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().secret_calls.clone()
    }

    pub fn total_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.parameter_calls.len() + state.secret_calls.len()
    }

    pub fn clients_built(&self) -> usize {
        self.state.lock().unwrap().clients_built
    }

    fn with(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }
}

impl Backends for FakeAws {
    fn check_secrets(&self) -> Result<()> {
        if self.state.lock().unwrap().secrets_unavailable {
            return Err(ConfigError::BackendUnavailable {
                backend: "secretsmanager",
                feature: "secretsmanager",
            }
            .into());
        }
        Ok(())
    }

    fn parameters(&self) -> Result<Box<dyn ParameterBackend>> {
        self.state.lock().unwrap().clients_built += 1;
        Ok(Box::new(self.clone()))
    }

    fn secrets(&self) -> Result<Box<dyn SecretBackend>> {
        self.check_secrets()?;
        self.state.lock().unwrap().clients_built += 1;
        Ok(Box::new(self.clone()))
    }
}

impl ParameterBackend for FakeAws {
    fn get_parameters(&self, names: &[String]) -> std::result::Result<ParameterBatch, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.parameter_calls.push(names.to_vec());

        if let Some(error) = &state.denied {
            return Err(error.clone());
        }

        let mut batch = ParameterBatch::default();
        for name in names {
            match state.parameters.get(name) {
                Some(value) => {
                    batch.found.insert(name.clone(), value.clone());
                }
                None => batch.not_found.push(name.clone()),
            }
        }
        Ok(batch)
    }
}

impl SecretBackend for FakeAws {
    fn get_secret_string(&self, id: &str) -> std::result::Result<String, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.secret_calls.push(id.to_string());

        state.secrets.get(id).cloned().ok_or_else(|| {
            BackendError::NotFound(format!(
                "ResourceNotFoundException: Secrets Manager can't find the specified secret ({})",
                id
            ))
        })
    }
}

/// Reporter that keeps every report.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<Vec<String>>>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<Vec<String>> {
        self.reports.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, variables: &[String]) {
        self.reports.lock().unwrap().push(variables.to_vec());
    }
}
