//! Clipboard
//!
//! Best-effort clipboard capability. Success is never verified.

use std::sync::Mutex;

/// Clipboard capability.
#[cfg_attr(test, mockall::automock)]
pub trait Clipboard: Send + Sync {
    /// Place `text` on the clipboard.
    fn copy_to_clipboard(&self, text: &str);
}

/// Process-local clipboard. Keeps the last copied text.
#[derive(Default)]
pub struct InMemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl InMemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last copied text.
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Clipboard for InMemoryClipboard {
    fn copy_to_clipboard(&self, text: &str) {
        *self.contents.lock().unwrap_or_else(|e| e.into_inner()) = Some(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_clipboard_keeps_last() {
        let clipboard = InMemoryClipboard::new();
        assert_eq!(clipboard.contents(), None);
        clipboard.copy_to_clipboard("a");
        clipboard.copy_to_clipboard("b");
        assert_eq!(clipboard.contents(), Some("b".to_string()));
    }
}
