//! API Key Error Types
//!
//! Error hierarchy for the API key integration, plus the mapping from
//! failed service responses to errors and user-facing messages.

use std::time::Duration;
use thiserror::Error;

use crate::types::{TokenId, TokenStatus};

/// Marker prefixing a structured token-creation failure.
///
/// Everything after the marker is a JSON object carrying an
/// `error_description` field.
pub const CREATE_ERROR_MARKER: &str = "Error to generate new token:";

/// Root error type for the API key integration.
#[derive(Error, Debug)]
pub enum ApiKeysError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

impl ApiKeysError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "APIKEYS_CONFIG",
            Self::Network(_) => "APIKEYS_NETWORK",
            Self::Protocol(_) => "APIKEYS_PROTOCOL",
            Self::Service(_) => "APIKEYS_SERVICE",
            Self::Token(_) => "APIKEYS_TOKEN",
        }
    }

    /// Message shown to the user.
    ///
    /// Service failures surface the server's message verbatim; everything
    /// else uses the error's display text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Service(ServiceError::Rejected { message, .. }) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },
}

/// Failure reported by the remote token service.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{message}")]
    Rejected { status: u16, message: String },
}

impl ServiceError {
    /// HTTP status of the failed response.
    pub fn status(&self) -> u16 {
        match self {
            Self::Rejected { status, .. } => *status,
        }
    }
}

/// Logical token error.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Cannot {action} token {id}: token is {status}")]
    PreconditionFailed {
        id: TokenId,
        action: &'static str,
        status: TokenStatus,
    },

    #[error("Missing credential: {field}")]
    InvalidCredentials { field: &'static str },
}

/// Result type for API key operations.
pub type ApiKeysResult<T> = Result<T, ApiKeysError>;

/// Error body returned by the token service.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub message: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl ServiceErrorBody {
    fn into_message(self) -> Option<String> {
        [self.message, self.error]
            .into_iter()
            .flatten()
            .find_map(|value| match value {
                serde_json::Value::String(s) if !s.is_empty() => Some(s),
                _ => None,
            })
    }
}

/// Parse error message out of an HTTP body.
pub fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ServiceErrorBody>(body)
        .ok()
        .and_then(ServiceErrorBody::into_message)
}

/// Create error from a failed HTTP response.
pub fn create_error_from_response(status: u16, status_text: &str, body: &str) -> ApiKeysError {
    let message = parse_error_message(body).unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            format!("HTTP {} {}", status, status_text).trim_end().to_string()
        } else {
            trimmed.to_string()
        }
    });

    ApiKeysError::Service(ServiceError::Rejected { status, message })
}

#[derive(serde::Deserialize)]
struct CreateErrorPayload {
    error_description: Option<String>,
}

/// Extract the user-facing part of a token-creation failure message.
///
/// Messages prefixed with [`CREATE_ERROR_MARKER`] carry a JSON object whose
/// `error_description` is returned. Anything that does not decode falls back
/// to the raw message.
pub fn decode_create_error(message: &str) -> String {
    let Some(payload) = message.strip_prefix(CREATE_ERROR_MARKER) else {
        return message.to_string();
    };

    serde_json::from_str::<CreateErrorPayload>(payload.trim())
        .ok()
        .and_then(|p| p.error_description)
        .unwrap_or_else(|| message.to_string())
}
