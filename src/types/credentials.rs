//! Credential Types
//!
//! Issuer credentials submitted when minting a new token.

use secrecy::{ExposeSecret, SecretString};

use crate::error::TokenError;

/// Identity and secret presented to the issuer.
#[derive(Clone)]
pub struct IssuerCredentials {
    /// Login identity (usually an email address).
    pub identity: String,
    /// Login secret.
    secret: SecretString,
}

impl IssuerCredentials {
    /// Create new credentials.
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: SecretString::new(secret.into()),
        }
    }

    /// Secret value.
    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }

    /// Both fields must be non-empty before a request is made.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.identity.trim().is_empty() {
            return Err(TokenError::InvalidCredentials { field: "identity" });
        }
        if self.secret.expose_secret().is_empty() {
            return Err(TokenError::InvalidCredentials { field: "secret" });
        }
        Ok(())
    }

    /// JSON payload expected by the create endpoint.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "username": self.identity,
            "password": self.secret.expose_secret(),
        })
    }
}

impl std::fmt::Debug for IssuerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerCredentials")
            .field("identity", &self.identity)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
