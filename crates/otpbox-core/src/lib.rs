#![forbid(unsafe_code)]

//! Core types for otpbox.
//!
//! # Role in otpbox
//! `otpbox-core` defines what flows *into* the widget: input events, clipboard
//! text, and host focus. It has no knowledge of the widget or the runtime, so
//! hosts can adapt their own event sources to these types.
//!
//! # Primary responsibilities
//! - **Event**: canonical key, paste, focus and clipboard events.
//! - **ClipboardReader**: best-effort clipboard text access with typed errors.
//! - **FocusHost**: focus movement and focus queries, scoped per widget.

pub mod clipboard;
pub mod event;
pub mod focus;

pub use clipboard::{ClipboardError, ClipboardReader, MemoryClipboard, NoClipboard};
#[cfg(all(feature = "system-clipboard", not(target_arch = "wasm32")))]
pub use clipboard::SystemClipboard;
pub use event::{Event, KeyCode, KeyEvent, KeyEventKind, Modifiers};
pub use focus::{CellId, FocusHost, FocusSnapshot, FocusTracker, WidgetId};
