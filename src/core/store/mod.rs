//! Durable byte storage for cache entries.
//!
//! The cache only needs "read whole entry" and "replace whole entry", so any
//! durable blob store can stand in for the filesystem.
//!
//! ## Adding a New Storage Backend
//!
//! 1. Implement the `BlobStore` trait
//! 2. Add the implementation in a new file
//! 3. Re-export from this module

use std::path::PathBuf;

use crate::error::Result;

mod fs;

pub use fs::Filesystem;

/// Cache entry slots, one per backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Direct parameter values, JSON object of identifier to value
    Parameters,
    /// Raw Secrets Manager payloads by secret identifier, JSON object
    Secrets,
    /// Expanded grouped directive, `KEY = VALUE` lines
    ParameterStore,
}

impl CacheKey {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Parameters => "parameters",
            Self::Secrets => "secrets",
            Self::ParameterStore => "parameter-store",
        }
    }
}

/// Byte storage trait.
pub trait BlobStore {
    /// Read a whole entry.
    ///
    /// # Returns
    ///
    /// `None` when no entry exists for `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Read` when an entry exists but cannot be read.
    fn read(&self, key: CacheKey) -> Result<Option<Vec<u8>>>;

    /// Replace an entry with `bytes`, truncating any previous content.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Write` on failure.
    fn write(&self, key: CacheKey, bytes: &[u8]) -> Result<()>;

    /// Human-readable location of an entry, for error messages.
    fn location(&self, key: CacheKey) -> String;
}

/// Paths of the three cache entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    pub parameters: PathBuf,
    pub secrets: PathBuf,
    pub parameter_store: PathBuf,
}

impl CachePaths {
    pub fn get(&self, key: CacheKey) -> &PathBuf {
        match key {
            CacheKey::Parameters => &self.parameters,
            CacheKey::Secrets => &self.secrets,
            CacheKey::ParameterStore => &self.parameter_store,
        }
    }
}
