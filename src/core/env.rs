//! Environment sinks.
//!
//! The resolver never touches process state directly. It captures a
//! [`Snapshot`] once and applies its results through an [`EnvSink`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use crate::error::{Error, Result};

/// Read-only capture of the environment, ordered by variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    vars: BTreeMap<String, String>,
}

impl Snapshot {
    /// Value of a variable at capture time
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// All variables in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl FromIterator<(String, String)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

/// Environment read/write capability.
pub trait EnvSink {
    /// Capture the current environment.
    fn snapshot(&self) -> Snapshot;

    /// Current value of one variable.
    fn get(&self, name: &str) -> Option<String>;

    /// Assign every variable in `vars`.
    ///
    /// # Errors
    ///
    /// The built-in sinks return `Error::InvalidVariable` and assign nothing
    /// if any entry fails [`check_variable`].
    fn set_all(&self, vars: &BTreeMap<String, String>) -> Result<()>;
}

/// Check that `name=value` can be held by a process environment.
///
/// Names must be non-empty and free of `=` and NUL; values must be free
/// of NUL.
pub fn check_variable(name: &str, value: &str) -> std::result::Result<(), &'static str> {
    if name.is_empty() {
        return Err("empty variable name");
    }
    if name.contains('=') {
        return Err("variable name contains '='");
    }
    if name.contains('\0') {
        return Err("variable name contains a NUL byte");
    }
    if value.contains('\0') {
        return Err("value contains a NUL byte");
    }
    Ok(())
}

fn check_all(vars: &BTreeMap<String, String>) -> Result<()> {
    for (name, value) in vars {
        check_variable(name, value).map_err(|reason| Error::InvalidVariable {
            name: name.clone(),
            reason,
        })?;
    }
    Ok(())
}

/// The real process environment.
///
/// Variables whose name or value is not valid UTF-8 are left out of the
/// snapshot; they can never hold a reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSink for ProcessEnv {
    fn snapshot(&self) -> Snapshot {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn set_all(&self, vars: &BTreeMap<String, String>) -> Result<()> {
        check_all(vars)?;
        for (name, value) in vars {
            trace!(name = %name, "setting process variable");
            std::env::set_var(name, value);
        }
        Ok(())
    }
}

/// Shared in-memory environment.
///
/// Clones share the same map, so a host can hand one clone to the resolver
/// as a mirror and read resolved values from another.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    vars: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink pre-populated with `pairs`.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            vars: Arc::new(Mutex::new(vars)),
        }
    }

    /// Copy of every variable.
    pub fn vars(&self) -> BTreeMap<String, String> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.vars.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EnvSink for MemorySink {
    fn snapshot(&self) -> Snapshot {
        self.lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).cloned()
    }

    fn set_all(&self, vars: &BTreeMap<String, String>) -> Result<()> {
        check_all(vars)?;
        let mut guard = self.lock();
        for (name, value) in vars {
            guard.insert(name.clone(), value.clone());
        }
        Ok(())
    }
}

/// A primary sink plus mirrors.
///
/// Snapshots and reads come from the primary. Writes go to the primary and
/// then to every mirror, so each variable is visible everywhere once
/// `set_all` returns.
pub struct Mirrored {
    primary: Box<dyn EnvSink>,
    mirrors: Vec<Box<dyn EnvSink>>,
}

impl Mirrored {
    pub fn new(primary: impl EnvSink + 'static) -> Self {
        Self {
            primary: Box::new(primary),
            mirrors: Vec::new(),
        }
    }

    /// Add a mirror that receives every write.
    pub fn mirror(mut self, sink: impl EnvSink + 'static) -> Self {
        self.mirrors.push(Box::new(sink));
        self
    }
}

impl EnvSink for Mirrored {
    fn snapshot(&self) -> Snapshot {
        self.primary.snapshot()
    }

    fn get(&self, name: &str) -> Option<String> {
        self.primary.get(name)
    }

    fn set_all(&self, vars: &BTreeMap<String, String>) -> Result<()> {
        self.primary.set_all(vars)?;
        for mirror in &self.mirrors {
            mirror.set_all(vars)?;
        }
        Ok(())
    }
}
