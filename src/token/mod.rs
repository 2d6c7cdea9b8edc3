//! Token Management
//!
//! Client-side lifecycle of issued API key tokens.
//!
//! This module provides:
//!
//! - **Status**: Active/Expired derivation from expiry and the clock
//! - **Store**: Authoritative local copy of the last fetched token list
//! - **Service**: Remote token service interface and its HTTP binding
//! - **Controller**: Fetch, create, revoke and delete orchestration
//! - **Visibility**: Per-token secret reveal overlay and display policy

pub mod controller;
pub mod service;
pub mod status;
pub mod store;
pub mod visibility;

// Status
pub use status::{derive_status, record_status, StatusDeriver};

// Store
pub use store::TokenStore;

// Service
pub use service::{
    create_mock_token_service, HttpTokenService, MockTokenService, TokenService,
    TokenServiceCall,
};

// Controller
pub use controller::{
    LifecycleController, OperationOutcome, CREATED_MESSAGE, CREATE_FAILED_PREFIX,
    DELETED_MESSAGE, DELETE_FAILED_PREFIX, REVOKED_MESSAGE, REVOKE_FAILED_PREFIX,
};

// Visibility
pub use visibility::{SecretDisplay, VisibilityToggle, SECRET_MASK};
