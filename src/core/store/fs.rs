//! Filesystem-backed cache storage.
//!
//! Each cache entry is one file. Writes truncate before writing, and files
//! are created with 0600 permissions on Unix since they hold plaintext.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tracing::trace;

use super::{BlobStore, CacheKey, CachePaths};
use crate::core::config::Settings;
use crate::error::{Result, StoreError};

/// Filesystem cache storage.
#[derive(Debug, Clone)]
pub struct Filesystem {
    paths: CachePaths,
}

impl Filesystem {
    pub fn new(paths: CachePaths) -> Self {
        Self { paths }
    }

    /// Use the cache locations configured in `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(CachePaths {
            parameters: settings.cache_path(CacheKey::Parameters),
            secrets: settings.cache_path(CacheKey::Secrets),
            parameter_store: settings.cache_path(CacheKey::ParameterStore),
        })
    }

    pub fn path(&self, key: CacheKey) -> &Path {
        self.paths.get(key)
    }
}

impl BlobStore for Filesystem {
    fn read(&self, key: CacheKey) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        trace!(path = %path.display(), "reading cache entry");

        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: path.display().to_string(),
                source,
            }
            .into()),
        }
    }

    fn write(&self, key: CacheKey, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        trace!(path = %path.display(), len = bytes.len(), "writing cache entry");

        write_truncated(path, bytes).map_err(|source| {
            StoreError::Write {
                path: path.display().to_string(),
                source,
            }
            .into()
        })
    }

    fn location(&self, key: CacheKey) -> String {
        self.path(key).display().to_string()
    }
}

fn write_truncated(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .mode(0o600)
            .open(path)?;
        file.write_all(bytes)?;
        file.flush()?;
    }

    #[cfg(not(unix))]
    {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)?;
        file.write_all(bytes)?;
        file.flush()?;
    }

    Ok(())
}
