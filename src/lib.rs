//! API Keys Integration Module
//!
//! Client-side management of issued API key tokens: list, mint, revoke and
//! delete tokens held by a remote token service, with derived status and a
//! per-token secret reveal overlay.
//!
//! # Features
//!
//! - Full-list refetch after every mutation; the service is the source of truth
//! - Active/Expired status derived from expiry and an injectable clock
//! - Masked secrets with an explicit, per-token reveal toggle
//! - Success/failure reporting through a pluggable notifier
//! - Structured logging via `tracing`
//!
//! # Example
//!
//! ```rust,ignore
//! use apikeys_integration::{apikeys_config, ApiKeysClient, IssuerCredentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = apikeys_config()
//!         .base_url("https://superset.example.com")
//!         .header("X-CSRFToken", "csrf-token")
//!         .build()?;
//!
//!     let client = ApiKeysClient::new(config)?;
//!     client.fetch_all().await;
//!
//!     client
//!         .create_token(&IssuerCredentials::new("admin", "admin"))
//!         .await;
//!
//!     for token in client.tokens() {
//!         println!("{} {} {}", token.id, token.status, token.display_secret);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: Token records, credentials and configuration types
//! - `error`: Error hierarchy and service error decoding
//! - `core`: Injected capabilities (HTTP transport, clock, notifier, clipboard)
//! - `token`: Status derivation, store, service binding, lifecycle controller, visibility
//! - `builders`: Fluent configuration builder
//! - `telemetry`: Structured logging
//! - `client`: High-level client combining all of the above

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod telemetry;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{apikeys_client, ApiKeysClient, COPIED_MESSAGE};

// Re-export builders
pub use builders::{apikeys_config, ApiKeysConfigBuilder};

// Re-export errors
pub use error::{
    create_error_from_response, decode_create_error, parse_error_message, ApiKeysError,
    ApiKeysResult, ConfigurationError, NetworkError, ProtocolError, ServiceError, TokenError,
};

// Re-export types
pub use types::{
    // Config
    ActionGate, ApiKeysConfig,
    // Credentials
    IssuerCredentials,
    // Token
    TokenActions, TokenId, TokenRecord, TokenStatus, TokenView,
};

// Re-export core components
pub use core::{
    // Transport
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport,
    // Clock
    Clock, FixedClock, SystemClock,
    // Notifier
    Notification, NotificationKind, Notifier, RecordingNotifier, TracingNotifier,
    // Clipboard
    Clipboard, InMemoryClipboard,
};

// Re-export token lifecycle
pub use token::{
    derive_status, HttpTokenService, LifecycleController, MockTokenService, OperationOutcome,
    SecretDisplay, StatusDeriver, TokenService, TokenStore, VisibilityToggle, SECRET_MASK,
};

// Re-export telemetry
pub use telemetry::{ApiKeysLogContext, InMemoryLogger, LogLevel, Logger, TracingLogger};
