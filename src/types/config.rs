//! Configuration Types
//!
//! API key client configuration types.

use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::error::{ApiKeysError, ConfigurationError};
use crate::types::TokenId;

/// Default resource path of the token service.
pub const DEFAULT_RESOURCE_PATH: &str = "/api/v1/apikeys/";
/// Default number of secret characters shown when revealed.
pub const DEFAULT_REVEAL_PREFIX_LEN: usize = 71;
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

/// Who enforces that revoke targets Active tokens and delete targets
/// Expired ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActionGate {
    /// The controller checks the derived status and rejects locally.
    #[default]
    ClientSide,
    /// Every request is forwarded; the service is the sole enforcer.
    ServerOnly,
}

/// API key client configuration.
#[derive(Clone, Debug)]
pub struct ApiKeysConfig {
    /// Base URL of the service.
    pub base_url: Url,
    /// Path of the token collection, relative to the base URL.
    pub resource_path: String,
    /// HTTP timeout.
    pub timeout: Duration,
    /// Headers sent with every request.
    pub default_headers: HashMap<String, String>,
    /// Revoke/delete gating policy.
    pub action_gate: ActionGate,
    /// Characters of the secret shown when revealed.
    pub reveal_prefix_len: usize,
}

impl ApiKeysConfig {
    /// Token collection endpoint (list and create).
    pub fn collection_url(&self) -> Result<Url, ApiKeysError> {
        self.join(&self.collection_path())
    }

    /// Revoke action endpoint for a token.
    pub fn revoke_url(&self, id: TokenId) -> Result<Url, ApiKeysError> {
        self.join(&format!("{}revoke/{}", self.collection_path(), id))
    }

    /// Resource endpoint for a token.
    pub fn token_url(&self, id: TokenId) -> Result<Url, ApiKeysError> {
        self.join(&format!("{}{}", self.collection_path(), id))
    }

    /// Collection path relative to the base URL, always slash-terminated.
    fn collection_path(&self) -> String {
        let path = self.resource_path.trim_matches('/');
        if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path)
        }
    }

    fn join(&self, path: &str) -> Result<Url, ApiKeysError> {
        with_trailing_slash(self.base_url.clone())
            .join(path)
            .map_err(|_| {
                ApiKeysError::Configuration(ConfigurationError::InvalidEndpoint {
                    url: format!("{}{}", self.base_url, path),
                })
            })
    }
}

/// Make the last path segment of `url` a directory so relative joins
/// extend it instead of replacing it.
pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
