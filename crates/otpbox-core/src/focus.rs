#![forbid(unsafe_code)]

//! Focus collaborator.
//!
//! Cells are addressed by [`CellId`], which pairs the owning widget's
//! [`WidgetId`] with the cell index. Scoping ids by widget means two OTP
//! widgets on one screen never mistake each other's cells for their own when
//! deciding whether focus has left the widget.
//!
//! The host exposes focus through [`FocusHost`]: move focus to a cell, and
//! report a [`FocusSnapshot`] of what is focused right now.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_WIDGET_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one widget instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(u64);

impl WidgetId {
    /// Allocate a process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_WIDGET_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw id chosen by the host.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Id of cell `index` within this widget.
    #[must_use]
    pub const fn cell(self, index: usize) -> CellId {
        CellId {
            widget: self,
            index,
        }
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one digit cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    /// Owning widget.
    pub widget: WidgetId,
    /// Zero-based cell index.
    pub index: usize,
}

impl CellId {
    /// Whether this cell belongs to `widget`.
    #[must_use]
    pub fn belongs_to(&self, widget: WidgetId) -> bool {
        self.widget == widget
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "otp-{}-{}", self.widget, self.index)
    }
}

/// Point-in-time view of host focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusSnapshot {
    /// Whether the host window/page has input focus at all.
    pub window_focused: bool,
    /// The focused OTP cell, if focus is on one.
    pub focused: Option<CellId>,
}

impl FocusSnapshot {
    /// Whether focus sits on a cell of `widget`.
    #[must_use]
    pub fn is_within(&self, widget: WidgetId) -> bool {
        self.focused.is_some_and(|id| id.belongs_to(widget))
    }
}

/// Host-side focus control.
pub trait FocusHost {
    /// Move focus to `cell`.
    fn focus(&mut self, cell: CellId);

    /// Report current focus.
    fn snapshot(&self) -> FocusSnapshot;
}

/// In-memory focus host.
///
/// Records every focus request so tests can assert on focus movement.
#[derive(Debug, Clone)]
pub struct FocusTracker {
    window_focused: bool,
    focused: Option<CellId>,
    history: Vec<CellId>,
}

impl FocusTracker {
    /// Create a tracker whose window has focus and no cell focused.
    #[must_use]
    pub fn new() -> Self {
        Self {
            window_focused: true,
            focused: None,
            history: Vec::new(),
        }
    }

    /// Set whether the host window has focus (builder).
    #[must_use]
    pub fn with_window_focused(mut self, focused: bool) -> Self {
        self.window_focused = focused;
        self
    }

    /// Set window focus.
    pub fn set_window_focused(&mut self, focused: bool) {
        self.window_focused = focused;
    }

    /// Move focus somewhere outside any OTP cell.
    pub fn focus_elsewhere(&mut self) {
        self.focused = None;
    }

    /// Currently focused cell.
    #[must_use]
    pub fn focused(&self) -> Option<CellId> {
        self.focused
    }

    /// Every cell focused so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[CellId] {
        &self.history
    }
}

impl Default for FocusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusHost for FocusTracker {
    fn focus(&mut self, cell: CellId) {
        self.focused = Some(cell);
        self.history.push(cell);
    }

    fn snapshot(&self) -> FocusSnapshot {
        FocusSnapshot {
            window_focused: self.window_focused,
            focused: self.focused,
        }
    }
}

impl<T: FocusHost + ?Sized> FocusHost for Box<T> {
    fn focus(&mut self, cell: CellId) {
        (**self).focus(cell);
    }

    fn snapshot(&self) -> FocusSnapshot {
        (**self).snapshot()
    }
}
