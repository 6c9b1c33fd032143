//! AWS Secrets Manager backend.
//!
//! Enable with `--features secretsmanager` (on by default). Only string
//! secrets are supported; a binary secret is reported as an error.

use tokio::runtime::Runtime;
use tracing::trace;

use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use super::{BackendError, SecretBackend};
use crate::error::Result;

/// Secrets Manager client bound to its own runtime.
pub struct SecretsManager {
    rt: Runtime,
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManager {
    /// Load AWS configuration and build a client.
    pub fn connect(region: Option<String>) -> Result<Self> {
        let (rt, config) = super::runtime::connect(region)?;
        let client = aws_sdk_secretsmanager::Client::new(&config);
        Ok(Self { rt, client })
    }
}

impl SecretBackend for SecretsManager {
    fn get_secret_string(&self, id: &str) -> std::result::Result<String, BackendError> {
        trace!(secret_id = %id, "calling secretsmanager:GetSecretValue");

        let output = self
            .rt
            .block_on(self.client.get_secret_value().secret_id(id).send())
            .map_err(classify)?;

        output
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| BackendError::Other {
                status: None,
                message: "secret has no string value (binary secrets are not supported)"
                    .to_string(),
            })
    }
}

fn classify<E>(err: SdkError<E, aws_sdk_secretsmanager::config::http::HttpResponse>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().map(str::to_string);
    BackendError::classify(
        status,
        code.as_deref(),
        DisplayErrorContext(&err).to_string(),
    )
}
