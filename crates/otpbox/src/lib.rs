#![forbid(unsafe_code)]

//! otpbox public facade crate.
//!
//! A segmented one-time-passcode entry widget: one cell per digit, automatic
//! focus movement, smart paste, form validation, and a clipboard watcher
//! that proposes codes it finds in copied text.
//!
//! This crate re-exports the common types from the internal crates, unifies
//! their errors, and offers a prelude plus a line-driven [`script::Session`]
//! for driving a widget without a host UI.
//!
//! ```no_run
//! use otpbox::prelude::*;
//!
//! let widget = OtpBox::new(OtpBoxConfig::new().with_length(6))?;
//! let mut program = Program::new(widget, MemoryClipboard::new(), FocusTracker::new());
//! program.advance(std::time::Duration::from_millis(100));
//! program.handle_event(Event::Key(KeyEvent::new(KeyCode::Char('4'))));
//! # Ok::<(), otpbox::Error>(())
//! ```

pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod script;

pub use error::{Error, Result};

// --- Core re-exports -------------------------------------------------------

pub use otpbox_core::clipboard::{ClipboardError, ClipboardReader, MemoryClipboard, NoClipboard};
#[cfg(all(feature = "system-clipboard", not(target_arch = "wasm32")))]
pub use otpbox_core::clipboard::SystemClipboard;
pub use otpbox_core::event::{Event, KeyCode, KeyEvent, KeyEventKind, Modifiers};
pub use otpbox_core::focus::{CellId, FocusHost, FocusSnapshot, FocusTracker, WidgetId};

// --- Runtime re-exports ----------------------------------------------------

pub use otpbox_runtime::{
    CancellationSource, CancellationToken, Cmd, Every, Model, Program, ProgramConfig, ReadMode,
    Subscription,
};

// --- Widget re-exports -----------------------------------------------------

pub use otpbox_widgets::{
    Banner, ClipboardWatcher, ConfigError, Detection, DigitCells, KeyDisposition, OtpBox,
    OtpBoxConfig, OtpBoxEvent, OtpBoxView, OtpDetector, OtpMsg, PatternKind, ScanOutcome,
    ValidationError, Validator, ValueAccessor,
};

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Cmd, Error, Event, FocusTracker, KeyCode, KeyEvent, MemoryClipboard, Model, OtpBox,
        OtpBoxConfig, OtpBoxEvent, OtpMsg, Program, Result, ValueAccessor,
    };

    pub use crate::{core, runtime, widgets};
}

pub use otpbox_core as core;
pub use otpbox_runtime as runtime;
pub use otpbox_widgets as widgets;
