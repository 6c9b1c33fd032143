//! Blocking bridge to the async AWS SDK.
//!
//! Resolution is one synchronous call at startup, so each client owns a
//! current-thread tokio runtime and drives the SDK with `block_on`.

use tokio::runtime::Runtime;
use tracing::trace;

use crate::error::{ConfigError, Result};

/// Build a runtime and load AWS configuration on it.
pub(super) fn connect(region: Option<String>) -> Result<(Runtime, aws_config::SdkConfig)> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ConfigError::Runtime)?;

    let config = rt.block_on(async {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            trace!(region = %region, "using region override");
            loader = loader.region(aws_config::Region::new(region));
        }
        loader.load().await
    });

    Ok((rt, config))
}
