//! API Key Types
//!
//! Core type definitions for API key management.

pub mod config;
pub mod credentials;
pub mod token;

pub use config::*;
pub use credentials::*;
pub use token::*;
