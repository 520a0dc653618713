#![forbid(unsafe_code)]

//! Input the host feeds into an OTP box.
//!
//! A host reports key presses aimed at the focused cell, pasted text, focus
//! changes of the focused cell, and clipboard text it read on its own. Only
//! keys a digit cell reacts to have their own [`KeyCode`]; the rest arrive
//! as `Char` and are suppressed by the widget.
//!
//! Key presses with Ctrl, Alt or Super held are shortcuts: a cell never
//! types their character and leaves them to the host.

use bitflags::bitflags;

/// Input event for the focused cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A keyboard event.
    Key(KeyEvent),

    /// Text pasted into the cell.
    Paste(String),

    /// The cell gained (`true`) or lost (`false`) focus.
    Focus(bool),

    /// Clipboard text the host read without being asked.
    Clipboard(String),
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Which key.
    pub code: KeyCode,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,

    /// Press, repeat or release.
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// A press of `code` with no modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
        }
    }

    /// Set the held modifiers (builder).
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set the event kind (builder).
    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// The ASCII digit this key types, if any.
    ///
    /// Shortcuts type nothing.
    #[must_use]
    pub const fn digit(&self) -> Option<char> {
        if self.is_shortcut() {
            return None;
        }
        match self.code {
            KeyCode::Char(c) if c.is_ascii_digit() => Some(c),
            _ => None,
        }
    }

    /// Whether Ctrl, Alt or Super is held.
    #[must_use]
    pub const fn is_shortcut(&self) -> bool {
        self.modifiers.intersects(Modifiers::SHORTCUT)
    }
}

/// Keys a digit cell distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A character key.
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    /// Shift+Tab.
    BackTab,
    Delete,
    Home,
    End,
    Up,
    Down,
    Left,
    Right,
}

impl KeyCode {
    /// Whether a cell lets this key through instead of suppressing it.
    ///
    /// Digits, deletion, tabbing and horizontal arrows are editing keys;
    /// everything else is swallowed so no character reaches the cell.
    #[must_use]
    pub const fn is_cell_editing_key(&self) -> bool {
        match self {
            Self::Char(c) => c.is_ascii_digit(),
            Self::Backspace | Self::Delete | Self::Tab | Self::BackTab | Self::Left | Self::Right => {
                true
            }
            _ => false,
        }
    }
}

/// The type of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    /// Key went down (default when the host cannot tell).
    #[default]
    Press,
    /// Auto-repeat while held.
    Repeat,
    /// Key went up.
    Release,
}

bitflags! {
    /// Modifier keys held during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const NONE  = 0b0000;
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const SUPER = 0b1000;
        /// Any of these turns a key press into a shortcut.
        const SHORTCUT = Self::ALT.bits() | Self::CTRL.bits() | Self::SUPER.bits();
    }
}
