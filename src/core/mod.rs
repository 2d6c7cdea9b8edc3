//! Core Components
//!
//! Infrastructure capabilities injected into the token lifecycle: HTTP
//! transport, clock, notifier and clipboard.

pub mod clipboard;
pub mod clock;
pub mod notifier;
pub mod transport;

pub use clipboard::*;
pub use clock::*;
pub use notifier::*;
pub use transport::*;
