#![forbid(unsafe_code)]

//! Clipboard collaborator.
//!
//! The widget only ever *reads* text from the clipboard, and only as a
//! best-effort convenience. A [`ClipboardReader`] returns the current textual
//! contents or a [`ClipboardError`] describing why it could not; callers treat
//! every error as non-fatal.
//!
//! Implementations:
//!
//! - [`MemoryClipboard`]: shared in-process buffer, used by tests and hosts
//!   that receive clipboard text through their own channel (OSC 52, browser
//!   bridge).
//! - [`NoClipboard`]: always reports [`ClipboardError::Unsupported`].
//! - [`SystemClipboard`]: the operating system clipboard via `arboard`
//!   (feature `system-clipboard`).

use std::fmt;
use std::sync::{Arc, Mutex};

/// Why a clipboard read failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    /// The environment refused access (browser permission prompt, sandbox).
    PermissionDenied,
    /// There is no clipboard in this environment.
    Unsupported,
    /// The clipboard exists but could not be read right now.
    Unavailable(String),
    /// The clipboard holds something that is not text.
    NotText,
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "clipboard access denied"),
            Self::Unsupported => write!(f, "clipboard not supported in this environment"),
            Self::Unavailable(msg) => write!(f, "clipboard unavailable: {msg}"),
            Self::NotText => write!(f, "clipboard does not contain text"),
        }
    }
}

impl std::error::Error for ClipboardError {}

/// Read-only access to textual clipboard contents.
///
/// Reads may be issued from a worker thread, so implementations must be
/// shareable.
pub trait ClipboardReader: Send + Sync {
    /// Return the current clipboard text.
    fn read_text(&self) -> Result<String, ClipboardError>;
}

impl<T: ClipboardReader + ?Sized> ClipboardReader for Arc<T> {
    fn read_text(&self) -> Result<String, ClipboardError> {
        (**self).read_text()
    }
}

impl<T: ClipboardReader + ?Sized> ClipboardReader for Box<T> {
    fn read_text(&self) -> Result<String, ClipboardError> {
        (**self).read_text()
    }
}

/// In-memory clipboard.
///
/// Clones share the same buffer, so a test can keep one handle and give
/// another to the runtime.
#[derive(Debug, Clone)]
pub struct MemoryClipboard {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug)]
struct MemoryState {
    contents: Result<String, ClipboardError>,
    reads: u64,
}

impl MemoryClipboard {
    /// Create an empty clipboard.
    #[must_use]
    pub fn new() -> Self {
        Self::with_text("")
    }

    /// Create a clipboard holding `text`.
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState {
                contents: Ok(text.into()),
                reads: 0,
            })),
        }
    }

    /// Replace the clipboard text.
    pub fn set_text(&self, text: impl Into<String>) {
        self.lock().contents = Ok(text.into());
    }

    /// Make subsequent reads fail with `err` until new text is set.
    pub fn fail_with(&self, err: ClipboardError) {
        self.lock().contents = Err(err);
    }

    /// Number of reads served so far.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.lock().reads
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardReader for MemoryClipboard {
    fn read_text(&self) -> Result<String, ClipboardError> {
        let mut state = self.lock();
        state.reads += 1;
        state.contents.clone()
    }
}

/// A clipboard that is never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClipboard;

impl ClipboardReader for NoClipboard {
    fn read_text(&self) -> Result<String, ClipboardError> {
        Err(ClipboardError::Unsupported)
    }
}

/// Operating system clipboard.
///
/// A fresh `arboard` handle is opened per read; holding one open keeps a
/// connection to the display server alive on some platforms.
#[cfg(all(feature = "system-clipboard", not(target_arch = "wasm32")))]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

#[cfg(all(feature = "system-clipboard", not(target_arch = "wasm32")))]
impl SystemClipboard {
    fn map_error(err: arboard::Error) -> ClipboardError {
        match err {
            arboard::Error::ContentNotAvailable => ClipboardError::NotText,
            arboard::Error::ClipboardNotSupported => ClipboardError::Unsupported,
            other => ClipboardError::Unavailable(other.to_string()),
        }
    }
}

#[cfg(all(feature = "system-clipboard", not(target_arch = "wasm32")))]
impl ClipboardReader for SystemClipboard {
    fn read_text(&self) -> Result<String, ClipboardError> {
        let mut clipboard = arboard::Clipboard::new().map_err(Self::map_error)?;
        let text = clipboard.get_text().map_err(Self::map_error)?;
        #[cfg(feature = "tracing")]
        tracing::trace!(bytes = text.len(), "system clipboard read");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_clipboard_starts_empty() {
        let clip = MemoryClipboard::new();
        assert_eq!(clip.read_text(), Ok(String::new()));
    }

    #[test]
    fn memory_clipboard_clones_share_contents() {
        let clip = MemoryClipboard::new();
        let handle = clip.clone();
        handle.set_text("Your code is 482913");
        assert_eq!(clip.read_text().as_deref(), Ok("Your code is 482913"));
    }

    #[test]
    fn memory_clipboard_counts_reads() {
        let clip = MemoryClipboard::with_text("123456");
        let _ = clip.read_text();
        let _ = clip.read_text();
        assert_eq!(clip.reads(), 2);
    }

    #[test]
    fn memory_clipboard_failure_until_text_set() {
        let clip = MemoryClipboard::with_text("111111");
        clip.fail_with(ClipboardError::PermissionDenied);
        assert_eq!(clip.read_text(), Err(ClipboardError::PermissionDenied));
        clip.set_text("222222");
        assert_eq!(clip.read_text().as_deref(), Ok("222222"));
    }

    #[test]
    fn no_clipboard_is_unsupported() {
        assert_eq!(NoClipboard.read_text(), Err(ClipboardError::Unsupported));
    }

    #[test]
    fn shared_reader_delegates() {
        let clip: Arc<dyn ClipboardReader> = Arc::new(MemoryClipboard::with_text("654321"));
        assert_eq!(clip.read_text().as_deref(), Ok("654321"));
    }

    #[test]
    fn error_display() {
        assert_eq!(
            ClipboardError::PermissionDenied.to_string(),
            "clipboard access denied"
        );
        assert_eq!(
            ClipboardError::Unavailable("busy".into()).to_string(),
            "clipboard unavailable: busy"
        );
    }
}
