//! Test support utilities for coldstart integration tests.
//!
//! Provides in-memory backends that count their calls, a recording
//! reporter, and an isolated test environment.

#![allow(dead_code)]

pub mod backends;
pub mod fixtures;

#[allow(unused_imports)]
pub use backends::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::collections::BTreeMap;

use coldstart::core::config::Settings;
use coldstart::core::store::Filesystem;
use coldstart::{EnvSink, MemorySink, Resolver};
use tempfile::TempDir;

/// Test environment with an isolated cache directory.
///
/// The environment is a [`MemorySink`], so no process-global state is
/// mutated and tests can run in parallel.
pub struct Test {
    /// Temporary directory holding every cache file
    pub cache: TempDir,
    pub env: MemorySink,
    pub aws: FakeAws,
    pub reporter: RecordingReporter,
}

impl Test {
    /// Create a test environment over `vars`.
    pub fn new(vars: &[(&str, &str)]) -> Self {
        Self {
            cache: TempDir::new().expect("failed to create temp dir"),
            env: MemorySink::from_pairs(vars.iter().copied()),
            aws: FakeAws::default(),
            reporter: RecordingReporter::default(),
        }
    }

    pub fn settings(&self) -> Settings {
        Settings::default().with_cache_dir(self.cache.path())
    }

    /// A fresh resolver over the shared cache, env and fakes, as a restarted
    /// process would build one.
    pub fn resolver(&self) -> Resolver {
        let settings = self.settings();
        let store = Filesystem::from_settings(&settings);
        Resolver::new(settings, self.env.clone(), store, self.aws.clone())
            .with_reporter(self.reporter.clone())
    }

    pub fn var(&self, name: &str) -> Option<String> {
        self.env.get(name)
    }

    /// Put `vars` back, as a restarted process would see them.
    pub fn reset(&self, vars: &[(&str, &str)]) {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.env.set_all(&vars).expect("memory sink never fails");
    }

    pub fn cache_file(&self, name: &str) -> std::path::PathBuf {
        self.cache.path().join(name)
    }
}
