//! Visibility Toggle
//!
//! Local-only reveal/mask of secret values and the policy used to render
//! them. This is display policy, not security: the full secret stays in
//! memory either way.

use std::sync::Arc;

use crate::token::TokenStore;
use crate::types::{TokenId, DEFAULT_REVEAL_PREFIX_LEN};

/// Fixed-width string shown in place of a masked secret.
pub const SECRET_MASK: &str = "********";

const ELLIPSIS: &str = "...";

/// How secrets are rendered for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecretDisplay {
    prefix_len: usize,
}

impl SecretDisplay {
    pub fn new(prefix_len: usize) -> Self {
        Self { prefix_len }
    }

    /// Masked secrets render as [`SECRET_MASK`]. Revealed secrets render
    /// their first `prefix_len` characters, with an ellipsis when cut.
    pub fn render(&self, secret: &str, revealed: bool) -> String {
        if !revealed {
            return SECRET_MASK.to_string();
        }

        match secret.char_indices().nth(self.prefix_len) {
            Some((cut, _)) => format!("{}{}", &secret[..cut], ELLIPSIS),
            None => secret.to_string(),
        }
    }
}

impl Default for SecretDisplay {
    fn default() -> Self {
        Self::new(DEFAULT_REVEAL_PREFIX_LEN)
    }
}

/// Reveal/mask control over a shared store. Never talks to the service.
#[derive(Clone)]
pub struct VisibilityToggle {
    store: Arc<TokenStore>,
    display: SecretDisplay,
}

impl VisibilityToggle {
    pub fn new(store: Arc<TokenStore>, display: SecretDisplay) -> Self {
        Self { store, display }
    }

    /// Flip reveal state. Stale ids are ignored and return `None`.
    pub fn toggle(&self, id: TokenId) -> Option<bool> {
        self.store.toggle_revealed(id)
    }

    /// Reveal a secret. Revealing an already revealed secret is a no-op.
    pub fn reveal(&self, id: TokenId) -> Option<bool> {
        self.store.set_revealed(id, true)
    }

    /// Mask a secret.
    pub fn mask(&self, id: TokenId) -> Option<bool> {
        self.store.set_revealed(id, false)
    }

    /// Rendered secret for a token, or `None` for a stale id.
    pub fn display_secret(&self, id: TokenId) -> Option<String> {
        let record = self.store.get(id)?;
        Some(
            self.display
                .render(record.secret(), self.store.is_revealed(id)),
        )
    }

    pub fn policy(&self) -> SecretDisplay {
        self.display
    }
}
