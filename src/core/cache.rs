//! Read-through cache over a [`BlobStore`].
//!
//! An entry, once written, is trusted until it is deleted externally. There
//! is no expiry. The grouped entry records the parameter it was expanded
//! from in a leading `# source:` comment, so a caller can notice when the
//! directive has since moved.

use std::collections::BTreeMap;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::core::dotenv;
use crate::core::store::{BlobStore, CacheKey};
use crate::error::{Error, Result};

const SOURCE_HEADER: &str = "# source: ";

/// Values returned by [`Cache::read_or_compute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached {
    pub values: BTreeMap<String, String>,
    /// `true` when `compute` ran, `false` on a cache hit
    pub fetched: bool,
    /// Source recorded in the entry, if any
    pub source: Option<String>,
}

/// Cache of resolved maps, one entry per [`CacheKey`].
pub struct Cache {
    store: Box<dyn BlobStore>,
}

impl Cache {
    pub fn new(store: impl BlobStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Return the entry for `key`, or compute, persist and return it.
    ///
    /// A failed write is logged and the computed values are still returned.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedCache` if an entry exists but does not parse,
    /// any error from `compute`, or a store read error.
    pub fn read_or_compute<F>(&self, key: CacheKey, compute: F) -> Result<Cached>
    where
        F: FnOnce() -> Result<BTreeMap<String, String>>,
    {
        self.entry(key, None, compute)
    }

    /// Like [`Cache::read_or_compute`], recording `source` in a newly
    /// written entry. Only the line format keeps it.
    pub fn read_or_compute_from<F>(&self, key: CacheKey, source: &str, compute: F) -> Result<Cached>
    where
        F: FnOnce() -> Result<BTreeMap<String, String>>,
    {
        self.entry(key, Some(source), compute)
    }

    fn entry<F>(&self, key: CacheKey, source: Option<&str>, compute: F) -> Result<Cached>
    where
        F: FnOnce() -> Result<BTreeMap<String, String>>,
    {
        if let Some(bytes) = self.store.read(key)? {
            let bytes = Zeroizing::new(bytes);
            let (values, source) = decode(key, &bytes).map_err(|reason| Error::MalformedCache {
                path: self.store.location(key),
                reason,
            })?;
            debug!(key = key.name(), entries = values.len(), "cache hit");
            return Ok(Cached {
                values,
                fetched: false,
                source,
            });
        }

        debug!(key = key.name(), "cache miss");
        let values = compute()?;

        match encode(key, source, &values) {
            Ok(encoded) => {
                let encoded = Zeroizing::new(encoded);
                if let Err(e) = self.store.write(key, &encoded) {
                    warn!(key = key.name(), error = %e, "failed to persist cache entry");
                }
            }
            Err(e) => warn!(key = key.name(), error = %e, "failed to encode cache entry"),
        }

        Ok(Cached {
            values,
            fetched: true,
            source: source.map(str::to_string),
        })
    }
}

type Decoded = (BTreeMap<String, String>, Option<String>);

fn decode(key: CacheKey, bytes: &[u8]) -> std::result::Result<Decoded, String> {
    match key {
        CacheKey::Parameters | CacheKey::Secrets => serde_json::from_slice(bytes)
            .map(|values| (values, None))
            .map_err(|e| e.to_string()),
        CacheKey::ParameterStore => {
            let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
            let source = text
                .lines()
                .next()
                .and_then(|line| line.strip_prefix(SOURCE_HEADER))
                .map(|s| s.trim().to_string());
            let values = dotenv::parse(text).map_err(|e| e.to_string())?;
            Ok((values, source))
        }
    }
}

fn encode(
    key: CacheKey,
    source: Option<&str>,
    values: &BTreeMap<String, String>,
) -> std::result::Result<Vec<u8>, String> {
    match key {
        CacheKey::Parameters | CacheKey::Secrets => {
            serde_json::to_vec(values).map_err(|e| e.to_string())
        }
        CacheKey::ParameterStore => {
            let mut text = String::new();
            if let Some(source) = source {
                text.push_str(SOURCE_HEADER);
                text.push_str(source);
                text.push('\n');
            }
            text.push_str(&dotenv::render(values));
            Ok(text.into_bytes())
        }
    }
}
