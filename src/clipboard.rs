//! Clipboard access behind a trait so the copy action is testable.

use std::sync::Mutex;

use crate::error::ClipboardError;

/// Minimal clipboard surface — the wizard only ever writes text.
pub trait Clipboard: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// System clipboard via arboard.
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| ClipboardError(e.to_string()))
    }
}

/// Captures copied text in memory for tests (and headless environments).
#[derive(Default)]
pub struct CaptureClipboard {
    copied: Mutex<Vec<String>>,
}

impl CaptureClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything copied so far, in order.
    pub fn copied(&self) -> Vec<String> {
        self.copied.lock().unwrap().clone()
    }
}

impl Clipboard for CaptureClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
