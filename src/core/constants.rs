//! Constants used throughout coldstart.
//!
//! Centralizes prefixes, well-known variable names and cache file names.

/// Value prefix marking an SSM parameter reference (`coldstart-ssm:/app/db`).
pub const PARAMETER_PREFIX: &str = "coldstart-ssm:";

/// Value prefix marking a Secrets Manager reference.
pub const SECRET_PREFIX: &str = "coldstart-secretsmanager:";

/// Variable holding the grouped parameter directive.
pub const PARAMETER_STORE_VARIABLE: &str = "COLDSTART_PARAMETER_STORE";

/// Value prefix of the grouped parameter directive.
pub const PARAMETER_STORE_PREFIX: &str = "coldstart-ssm-env:";

/// Maximum number of names accepted by one `GetParameters` call.
pub const PARAMETER_BATCH_SIZE: usize = 10;

/// Cache file for direct parameter references, inside the temp dir.
pub const PARAMETERS_CACHE_FILE: &str = "coldstart-ssm-parameters.json";

/// Cache file for Secrets Manager references, inside the temp dir.
pub const SECRETS_CACHE_FILE: &str = "coldstart-secretsmanager.json";

/// Cache file for the grouped parameter directive.
pub const PARAMETER_STORE_CACHE_FILE: &str = ".coldstart-parameter-store.env";

/// Directory overrides for the grouped cache file, first match wins.
pub const PARAMETER_STORE_DIR_VARS: &[&str] =
    &["COLDSTART_PARAMETER_STORE_DIR", "COLDSTART_CACHE_DIR"];

/// Region override for the AWS clients.
pub const REGION_VAR: &str = "COLDSTART_REGION";

/// Prefix of the diagnostic line written after a live fetch.
pub const REPORT_PREFIX: &str = "[coldstart] Loaded these environment variables from AWS:";
