//! Coldstart - resolve AWS secret references in environment variables at
//! process startup, with a local cache for short-lived processes.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── error             # Error taxonomy
//! └── core/
//!     ├── config        # Prefixes, cache locations, region
//!     ├── constants     # Well-known names and prefixes
//!     ├── env           # Environment sinks (process, memory, mirrored)
//!     ├── reference     # Reference classification
//!     ├── dotenv        # KEY=VALUE format
//!     ├── backend/      # Backend capabilities
//!     │   ├── mod       # Traits, tagged errors, AWS factory
//!     │   ├── ssm       # SSM Parameter Store (feature `ssm`)
//!     │   └── secretsmanager  # Secrets Manager (feature `secretsmanager`)
//!     ├── fetch         # Batched and per-secret fetchers
//!     ├── store/        # Durable byte storage
//!     │   └── fs        # Filesystem implementation
//!     ├── cache         # Read-through cache
//!     ├── report        # Post-fetch diagnostic line
//!     └── resolver      # Orchestrator
//! ```
//!
//! # Usage
//!
//! ```ignore
//! // DB_PASSWORD=coldstart-ssm:/app/db-password
//! // APP_SECRETS=coldstart-secretsmanager:prod/app   (JSON object of variables)
//! // COLDSTART_PARAMETER_STORE=coldstart-ssm-env:/app/env   (KEY=VALUE lines)
//! coldstart::resolve()?;
//! let password = std::env::var("DB_PASSWORD")?;
//! ```

pub mod core;
pub mod error;

pub use crate::core::env::{EnvSink, MemorySink, Mirrored, ProcessEnv, Snapshot};
pub use crate::core::resolver::{Resolution, Resolver};
pub use crate::error::{Error, Result};

/// Resolve references in the process environment with default settings.
///
/// Uses the filesystem cache and AWS clients from the default provider
/// chain, and writes one line to stderr when a backend was called.
///
/// # Errors
///
/// Any [`Error`]; see [`Resolver::resolve`].
pub fn resolve() -> Result<Resolution> {
    Resolver::from_env().resolve()
}
