//! Resolution settings.
//!
//! Settings are derived from the captured environment snapshot rather than
//! from process state, so a resolver can be configured entirely in tests.

use std::path::PathBuf;

use tracing::debug;

use crate::core::constants;
use crate::core::env::Snapshot;
use crate::core::store::CacheKey;

/// Prefixes, well-known names and cache locations for one resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Value prefix for direct parameter references
    pub parameter_prefix: String,
    /// Value prefix for direct secret references
    pub secret_prefix: String,
    /// Name of the variable carrying the grouped directive
    pub parameter_store_variable: String,
    /// Value prefix for the grouped directive
    pub parameter_store_prefix: String,
    /// Directory holding the per-kind JSON caches
    pub cache_dir: PathBuf,
    /// Directory holding the grouped `KEY = VALUE` cache
    pub parameter_store_dir: PathBuf,
    /// AWS region override; `None` uses the default provider chain
    pub region: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            parameter_prefix: constants::PARAMETER_PREFIX.to_string(),
            secret_prefix: constants::SECRET_PREFIX.to_string(),
            parameter_store_variable: constants::PARAMETER_STORE_VARIABLE.to_string(),
            parameter_store_prefix: constants::PARAMETER_STORE_PREFIX.to_string(),
            cache_dir: std::env::temp_dir(),
            parameter_store_dir: PathBuf::from("."),
            region: None,
        }
    }
}

impl Settings {
    /// Build settings from a snapshot, honoring the override variables.
    ///
    /// The grouped cache directory comes from the first of
    /// `COLDSTART_PARAMETER_STORE_DIR` and `COLDSTART_CACHE_DIR` that is set
    /// and non-empty, falling back to the working directory.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut settings = Self::default();

        if let Some(dir) = constants::PARAMETER_STORE_DIR_VARS
            .iter()
            .filter_map(|name| snapshot.get(name))
            .find(|value| !value.is_empty())
        {
            settings.parameter_store_dir = PathBuf::from(dir);
        } else if let Ok(cwd) = std::env::current_dir() {
            settings.parameter_store_dir = cwd;
        }

        settings.region = snapshot
            .get(constants::REGION_VAR)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        debug!(
            cache_dir = %settings.cache_dir.display(),
            parameter_store_dir = %settings.parameter_store_dir.display(),
            region = ?settings.region,
            "settings loaded"
        );

        settings
    }

    /// Put every cache file under one directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.cache_dir = dir.clone();
        self.parameter_store_dir = dir;
        self
    }

    /// Location of the cache entry for `key`.
    pub fn cache_path(&self, key: CacheKey) -> PathBuf {
        match key {
            CacheKey::Parameters => self.cache_dir.join(constants::PARAMETERS_CACHE_FILE),
            CacheKey::Secrets => self.cache_dir.join(constants::SECRETS_CACHE_FILE),
            CacheKey::ParameterStore => self
                .parameter_store_dir
                .join(constants::PARAMETER_STORE_CACHE_FILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_first_override_wins() {
        let settings = Settings::from_snapshot(&snapshot(&[
            ("COLDSTART_PARAMETER_STORE_DIR", "/opt/first"),
            ("COLDSTART_CACHE_DIR", "/opt/second"),
        ]));
        assert_eq!(settings.parameter_store_dir, PathBuf::from("/opt/first"));
    }

    #[test]
    fn test_second_override_used_when_first_unset() {
        let settings =
            Settings::from_snapshot(&snapshot(&[("COLDSTART_CACHE_DIR", "/opt/second")]));
        assert_eq!(settings.parameter_store_dir, PathBuf::from("/opt/second"));
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let settings = Settings::from_snapshot(&snapshot(&[
            ("COLDSTART_PARAMETER_STORE_DIR", ""),
            ("COLDSTART_CACHE_DIR", "/opt/second"),
        ]));
        assert_eq!(settings.parameter_store_dir, PathBuf::from("/opt/second"));
    }

    #[test]
    fn test_defaults_to_working_directory() {
        let settings = Settings::from_snapshot(&Snapshot::default());
        assert_eq!(
            settings.parameter_store_dir,
            std::env::current_dir().unwrap()
        );
        assert!(settings.region.is_none());
    }

    #[test]
    fn test_region_override() {
        let settings = Settings::from_snapshot(&snapshot(&[("COLDSTART_REGION", "eu-west-3")]));
        assert_eq!(settings.region.as_deref(), Some("eu-west-3"));
    }

    #[test]
    fn test_cache_paths() {
        let settings = Settings::default().with_cache_dir("/tmp/cs");
        assert_eq!(
            settings.cache_path(CacheKey::Parameters),
            PathBuf::from("/tmp/cs/coldstart-ssm-parameters.json")
        );
        assert_eq!(
            settings.cache_path(CacheKey::Secrets),
            PathBuf::from("/tmp/cs/coldstart-secretsmanager.json")
        );
        assert_eq!(
            settings.cache_path(CacheKey::ParameterStore),
            PathBuf::from("/tmp/cs/.coldstart-parameter-store.env")
        );
    }
}
