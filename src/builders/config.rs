//! Configuration Builder
//!
//! Fluent builder for API key client configuration.

use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::error::{ApiKeysError, ConfigurationError};
use crate::types::config::with_trailing_slash;
use crate::types::{
    ActionGate, ApiKeysConfig, DEFAULT_RESOURCE_PATH, DEFAULT_REVEAL_PREFIX_LEN,
    DEFAULT_TIMEOUT_MS,
};

/// API key configuration builder.
#[derive(Default)]
pub struct ApiKeysConfigBuilder {
    base_url: Option<String>,
    resource_path: Option<String>,
    timeout: Option<Duration>,
    default_headers: HashMap<String, String>,
    action_gate: ActionGate,
    reveal_prefix_len: Option<usize>,
}

impl ApiKeysConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the token collection path.
    pub fn resource_path(mut self, path: impl Into<String>) -> Self {
        self.resource_path = Some(path.into());
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers
            .insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Set the revoke/delete gating policy.
    pub fn action_gate(mut self, gate: ActionGate) -> Self {
        self.action_gate = gate;
        self
    }

    /// Set how many secret characters are shown when revealed.
    pub fn reveal_prefix_len(mut self, len: usize) -> Self {
        self.reveal_prefix_len = Some(len);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<ApiKeysConfig, ApiKeysError> {
        let raw_base = self.base_url.ok_or_else(|| {
            ApiKeysError::Configuration(ConfigurationError::MissingField {
                field: "base_url".to_string(),
            })
        })?;

        let base_url = Url::parse(&raw_base).map_err(|_| {
            ApiKeysError::Configuration(ConfigurationError::InvalidEndpoint {
                url: raw_base.clone(),
            })
        })?;

        if base_url.cannot_be_a_base() {
            return Err(ApiKeysError::Configuration(
                ConfigurationError::InvalidEndpoint { url: raw_base },
            ));
        }
        let base_url = with_trailing_slash(base_url);

        let reveal_prefix_len = self.reveal_prefix_len.unwrap_or(DEFAULT_REVEAL_PREFIX_LEN);
        if reveal_prefix_len == 0 {
            return Err(ApiKeysError::Configuration(
                ConfigurationError::InvalidConfig {
                    message: "reveal_prefix_len must be greater than zero".to_string(),
                },
            ));
        }

        let config = ApiKeysConfig {
            base_url,
            resource_path: self
                .resource_path
                .unwrap_or_else(|| DEFAULT_RESOURCE_PATH.to_string()),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
            default_headers: self.default_headers,
            action_gate: self.action_gate,
            reveal_prefix_len,
        };

        // Surface a bad resource path at build time rather than on first request.
        config.collection_url()?;

        Ok(config)
    }
}

/// Create a new API key configuration builder.
pub fn apikeys_config() -> ApiKeysConfigBuilder {
    ApiKeysConfigBuilder::new()
}
