//! AWS SSM Parameter Store backend.
//!
//! Enable with `--features ssm` (on by default). Parameters are always
//! requested with decryption so SecureString values come back in plaintext.
//! Credentials come from the default provider chain.

use tokio::runtime::Runtime;
use tracing::trace;

use aws_sdk_ssm::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use super::{BackendError, ParameterBackend, ParameterBatch};
use crate::error::Result;

/// SSM client bound to its own runtime.
pub struct Ssm {
    rt: Runtime,
    client: aws_sdk_ssm::Client,
}

impl Ssm {
    /// Load AWS configuration and build a client.
    pub fn connect(region: Option<String>) -> Result<Self> {
        let (rt, config) = super::runtime::connect(region)?;
        let client = aws_sdk_ssm::Client::new(&config);
        Ok(Self { rt, client })
    }
}

impl ParameterBackend for Ssm {
    fn get_parameters(&self, names: &[String]) -> std::result::Result<ParameterBatch, BackendError> {
        trace!(count = names.len(), "calling ssm:GetParameters");

        let output = self
            .rt
            .block_on(
                self.client
                    .get_parameters()
                    .set_names(Some(names.to_vec()))
                    .with_decryption(true)
                    .send(),
            )
            .map_err(classify)?;

        let mut batch = ParameterBatch::default();
        for parameter in output.parameters() {
            if let (Some(name), Some(value)) = (parameter.name(), parameter.value()) {
                batch.found.insert(name.to_string(), value.to_string());
            }
        }
        batch.not_found = output.invalid_parameters().to_vec();

        trace!(
            found = batch.found.len(),
            not_found = batch.not_found.len(),
            "ssm:GetParameters returned"
        );
        Ok(batch)
    }
}

fn classify<E>(err: SdkError<E, aws_sdk_ssm::config::http::HttpResponse>) -> BackendError
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
