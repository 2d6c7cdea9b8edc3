//! Token Types
//!
//! API key token records as synced from the token service, and the
//! derived views handed to the display layer.

use chrono::{DateTime, NaiveDateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

/// Identifier assigned by the token service.
pub type TokenId = i64;

/// Activity state of a token, derived from its expiry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenStatus {
    Active,
    Expired,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Expired => "Expired",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One issued credential, exactly as the token service reported it.
///
/// Records are only ever replaced wholesale by a refetch; nothing on the
/// client patches individual fields.
#[derive(Clone, Deserialize)]
pub struct TokenRecord {
    /// Service-assigned identifier.
    pub id: TokenId,
    /// Bearer credential.
    #[serde(rename = "token", alias = "secret_value")]
    secret_value: SecretString,
    /// Issuance time.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Expiry time.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub expires_at: DateTime<Utc>,
    /// Set when the service reports the token as revoked.
    #[serde(default)]
    pub revoked: bool,
}

impl TokenRecord {
    /// Create a new record.
    pub fn new(
        id: TokenId,
        secret_value: impl Into<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            secret_value: SecretString::new(secret_value.into()),
            created_at,
            expires_at,
            revoked: false,
        }
    }

    /// Mark the record as revoked by the service.
    pub fn with_revoked(mut self, revoked: bool) -> Self {
        self.revoked = revoked;
        self
    }

    /// Full secret value.
    pub fn secret(&self) -> &str {
        self.secret_value.expose_secret()
    }
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("id", &self.id)
            .field("secret_value", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("revoked", &self.revoked)
            .finish()
    }
}

/// List response body.
///
/// The service wraps the list in `{"result": [...]}`; a bare array is
/// accepted as well.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum TokenListResponse {
    Wrapped { result: Vec<TokenRecord> },
    Bare(Vec<TokenRecord>),
}

impl TokenListResponse {
    pub fn into_records(self) -> Vec<TokenRecord> {
        match self {
            Self::Wrapped { result } => result,
            Self::Bare(records) => records,
        }
    }
}

/// Read-only snapshot of a token for the display layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenView {
    pub id: TokenId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Status derived at the time the view was taken.
    pub status: TokenStatus,
    /// Whether the secret is currently revealed.
    pub revealed: bool,
    /// Secret rendered by the display policy (masked or truncated).
    pub display_secret: String,
}

/// Actions the display layer should offer for a token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenActions {
    pub can_revoke: bool,
    pub can_delete: bool,
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO-8601 timestamp, with or without offset.
///
/// Naive timestamps are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}
