#![forbid(unsafe_code)]

//! Segmented one-time-passcode entry widget.
//!
//! [`OtpBox`] renders one cell per digit and combines three parts:
//!
//! - cell management: typing, deletion, arrow navigation and paste
//!   distribution across [`DigitCells`], with focus moves deferred to the
//!   next tick
//! - the form adapter: [`ValueAccessor`] and [`Validator`] implementations,
//!   plus blur-driven touched state
//! - the clipboard watcher: periodic and on-demand scans of clipboard text
//!   that may propose a code for auto-fill
//!
//! The widget is an Elm-style [`Model`]; mount it in a
//! [`Program`](otpbox_runtime::Program) together with a clipboard reader and a
//! focus host. Direct method calls are also supported; methods that need a
//! side effect return the [`Cmd`] to run.
//!
//! # Events
//!
//! Every edit pushes [`OtpBoxEvent::Change`]; an edit that leaves every cell
//! holding a digit additionally pushes [`OtpBoxEvent::Complete`]. State is
//! fully updated before either is raised. Drain them with
//! [`OtpBox::take_events`].
//!
//! # Example
//!
//! ```ignore
//! let widget = OtpBox::new(OtpBoxConfig::default())?;
//! let mut program = Program::new(widget, MemoryClipboard::new(), FocusTracker::new());
//! program.advance(Duration::from_millis(100)); // auto-focus lands on cell 0
//! for d in "482913".chars() {
//!     program.handle_event(Event::Key(KeyEvent::new(KeyCode::Char(d))));
//!     program.pump();
//! }
//! assert_eq!(program.model().value(), "482913");
//! ```

pub mod cells;
pub mod detect;
pub mod form;
pub mod view;
pub mod watcher;

use std::fmt;
use std::time::Duration;

use otpbox_core::clipboard::ClipboardError;
use otpbox_core::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use otpbox_core::focus::{FocusSnapshot, WidgetId};
use otpbox_runtime::{Cmd, Every, Model, Subscription};

use crate::config::{ConfigError, OtpBoxConfig};

pub use cells::DigitCells;
pub use detect::{Detection, OtpDetector, OtpPattern, PatternKind, format_display, strip_non_digits};
pub use form::{ChangeFn, TouchFn, ValidationError, Validator, ValueAccessor, validate_value};
pub use view::{BannerView, CellView, OtpBoxView};
pub use watcher::{Banner, ClipboardWatcher, ScanOutcome};

/// Outbound notification raised by an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpBoxEvent {
    /// The value changed; may be partial.
    Change(String),
    /// Every cell holds a digit.
    Complete(String),
}

/// What happened to a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// The key's normal editing action should happen.
    Default,
    /// The widget acted on the key; no further action.
    Handled,
    /// The key is not allowed in a cell and was swallowed.
    Suppressed,
}

/// Result of [`OtpBox::handle_key_down`].
#[derive(Debug)]
pub struct KeyOutcome {
    /// What the caller should do with the key.
    pub disposition: KeyDisposition,
    /// Side effects to run.
    pub cmd: Cmd<OtpMsg>,
}

impl KeyOutcome {
    fn handled(cmd: Cmd<OtpMsg>) -> Self {
        Self {
            disposition: KeyDisposition::Handled,
            cmd,
        }
    }

    fn with(disposition: KeyDisposition) -> Self {
        Self {
            disposition,
            cmd: Cmd::none(),
        }
    }
}

/// Messages understood by [`OtpBox`].
#[derive(Debug, Clone, PartialEq)]
pub enum OtpMsg {
    /// Raw content of cell `index` after an input.
    Input { index: usize, value: String },
    /// Key press on cell `index`, including its default editing action.
    Key { index: usize, key: KeyEvent },
    /// Text pasted into cell `index`.
    Paste { index: usize, text: String },
    /// The host moved focus onto cell `index`.
    Focused(usize),
    /// Cell `index` lost focus.
    Blur(usize),
    /// Host event aimed at the focused cell.
    Event(Event),
    /// Form-driven value replacement.
    SetValue(String),
    /// Empty every cell.
    Clear,
    /// Accept the proposed code.
    Accept,
    /// Reject the proposed code.
    Dismiss,
    /// User-requested clipboard check.
    CheckClipboard,
    /// Mark touched and validate.
    TriggerValidation,
    /// Deferred focus move.
    ApplyFocus(usize),
    /// Blur grace period elapsed.
    BlurElapsed,
    /// Focus after the blur grace period.
    BlurSettled(FocusSnapshot),
    /// Poll subscription tick.
    PollTick,
    /// Focus at poll time.
    PollSettled(FocusSnapshot),
    /// Delayed clipboard check after a clear.
    Recheck,
    /// A clipboard read finished.
    ClipboardRead(Result<String, ClipboardError>),
    /// Delayed completion after an auto-fill.
    AutofillComplete,
}

impl From<Event> for OtpMsg {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

/// The OTP entry widget.
pub struct OtpBox {
    id: WidgetId,
    config: OtpBoxConfig,
    cells: DigitCells,
    focused: Option<usize>,
    touched: bool,
    disabled: bool,
    errors: Option<ValidationError>,
    watcher: ClipboardWatcher,
    on_change: Option<ChangeFn>,
    on_touched: Option<TouchFn>,
    events: Vec<OtpBoxEvent>,
    mounted: bool,
}

impl fmt::Debug for OtpBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpBox")
            .field("id", &self.id)
            .field("cells", &self.cells)
            .field("focused", &self.focused)
            .field("touched", &self.touched)
            .field("errors", &self.errors)
            .field("banner", self.watcher.banner())
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

impl OtpBox {
    /// Create a widget with a fresh identity.
    pub fn new(config: OtpBoxConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            id: WidgetId::next(),
            cells: DigitCells::new(config.length),
            watcher: ClipboardWatcher::new(config.length),
            config,
            focused: None,
            touched: false,
            disabled: false,
            errors: None,
            on_change: None,
            on_touched: None,
            events: Vec::new(),
            mounted: false,
        })
    }

    /// Use a specific identity (builder).
    #[must_use]
    pub fn with_id(mut self, id: WidgetId) -> Self {
        self.id = id;
        self
    }

    /// Widget identity; cell ids derive from it.
    #[must_use]
    pub fn id(&self) -> WidgetId {
        self.id
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &OtpBoxConfig {
        &self.config
    }

    /// Cell contents.
    #[must_use]
    pub fn cells(&self) -> &DigitCells {
        &self.cells
    }

    /// Cell the widget last moved focus to or was told has focus.
    #[must_use]
    pub fn focused_index(&self) -> Option<usize> {
        self.focused
    }

    /// Whether the user has left the widget at least once.
    #[must_use]
    pub fn is_touched(&self) -> bool {
        self.touched
    }

    /// Whether the host disabled the control.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Result of the latest validation.
    #[must_use]
    pub fn errors(&self) -> Option<&ValidationError> {
        self.errors.as_ref()
    }

    /// Clipboard watcher state.
    #[must_use]
    pub fn watcher(&self) -> &ClipboardWatcher {
        &self.watcher
    }

    /// Latest clipboard status line.
    #[must_use]
    pub fn status(&self) -> &str {
        self.watcher.status()
    }

    /// Whether a clipboard read was attempted.
    #[must_use]
    pub fn clipboard_checked(&self) -> bool {
        self.watcher.checked()
    }

    /// Whether the widget has been mounted in a program.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Events raised since the last drain.
    #[must_use]
    pub fn events(&self) -> &[OtpBoxEvent] {
        &self.events
    }

    /// Drain raised events.
    pub fn take_events(&mut self) -> Vec<OtpBoxEvent> {
        std::mem::take(&mut self.events)
    }

    /// Concatenated cell contents.
    #[must_use]
    pub fn value(&self) -> String {
        self.cells.value()
    }

    /// Whether every cell is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether every cell holds a digit.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.cells.is_filled()
    }

    fn last_index(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    fn edit_span(&self, operation: &'static str) -> tracing::span::EnteredSpan {
        tracing::debug_span!(
            "otp_box.edit",
            operation,
            filled = self.cells.filled_count(),
            length = self.cells.len()
        )
        .entered()
    }

    fn focus_cell(&self, index: usize) -> Cmd<OtpMsg> {
        Cmd::after(Duration::ZERO, OtpMsg::ApplyFocus(index))
    }

    fn revalidate(&mut self) {
        self.errors = Validator::validate(self);
    }

    fn notify_value(&mut self, value: &str) {
        if let Some(on_change) = self.on_change.as_mut() {
            on_change(value);
        }
    }

    fn emit_change(&mut self) {
        let value = self.cells.value();
        self.notify_value(&value);
        self.events.push(OtpBoxEvent::Change(value));
        self.revalidate();
    }

    fn emit_complete(&mut self) {
        if !self.cells.is_filled() {
            return;
        }
        let value = self.cells.value();
        tracing::debug!(widget = %self.id, "OTP complete");
        self.watcher.set_status(watcher::entered_status(&value));
        self.notify_value(&value);
        self.events.push(OtpBoxEvent::Complete(value));
        self.revalidate();
    }

    // --- cell management ---

    /// Replace the value from outside, without raising events.
    pub fn write(&mut self, value: &str) {
        let _span = self.edit_span("write");
        self.cells.write(value);
        self.revalidate();
    }

    /// Assign `digits` from `start`, clipped to the cell count.
    ///
    /// Focus moves to `min(start + digits.len(), length - 1)`. Raises a
    /// change, and a completion if at least one digit landed and every cell
    /// now holds a digit.
    pub fn fill_from(&mut self, digits: &[char], start: usize) -> Cmd<OtpMsg> {
        let _span = self.edit_span("fill_from");
        let written = self.cells.assign_from(digits, start);
        let target = start.saturating_add(digits.len()).min(self.last_index());
        self.emit_change();
        if written > 0 && self.cells.is_filled() {
            self.emit_complete();
        }
        self.focus_cell(target)
    }

    /// Handle the raw content of cell `index` after an input.
    ///
    /// More than one character is treated as a paste into that cell.
    pub fn handle_cell_input(&mut self, raw: &str, index: usize) -> Cmd<OtpMsg> {
        if index >= self.cells.len() {
            tracing::debug!(index, "input for out-of-range cell ignored");
            return Cmd::none();
        }
        let mut chars = raw.chars();
        let first = chars.next();
        if chars.next().is_some() {
            let digits: Vec<char> = raw.chars().filter(char::is_ascii_digit).collect();
            return self.fill_from(&digits, index);
        }

        let _span = self.edit_span("input");
        self.cells.set(index, first);
        let cmd = if first.is_some() && index < self.last_index() {
            self.focus_cell(index + 1)
        } else {
            Cmd::none()
        };
        self.emit_change();
        if self.cells.is_filled() {
            self.emit_complete();
        }
        cmd
    }

    /// Keyboard handling that happens before a key's default action.
    ///
    /// Backspace on an empty cell clears and focuses the previous cell;
    /// Left and Right move focus; keys that cannot edit a cell are
    /// suppressed. Shortcuts are left to the host.
    pub fn handle_key_down(&mut self, key: &KeyEvent, index: usize) -> KeyOutcome {
        if index >= self.cells.len() {
            tracing::debug!(index, "key for out-of-range cell ignored");
            return KeyOutcome::with(KeyDisposition::Suppressed);
        }
        if key.is_shortcut() {
            return KeyOutcome::with(KeyDisposition::Default);
        }
        match key.code {
            KeyCode::Backspace if index > 0 && self.cells.get(index).is_none() => {
                let _span = self.edit_span("backspace");
                self.cells.set(index - 1, None);
                let cmd = self.focus_cell(index - 1);
                self.emit_change();
                KeyOutcome::handled(cmd)
            }
            KeyCode::Left if index > 0 => KeyOutcome::handled(self.focus_cell(index - 1)),
            KeyCode::Right if index < self.last_index() => {
                KeyOutcome::handled(self.focus_cell(index + 1))
            }
            code if code.is_cell_editing_key() => KeyOutcome::with(KeyDisposition::Default),
            _ => KeyOutcome::with(KeyDisposition::Suppressed),
        }
    }

    /// Full key handling for hosts without native text inputs: runs
    /// [`handle_key_down`](Self::handle_key_down) and then the default
    /// action (digit entry, deletion) if the key was not consumed.
    pub fn handle_key_press(&mut self, key: &KeyEvent, index: usize) -> Cmd<OtpMsg> {
        if key.kind == KeyEventKind::Release || index >= self.cells.len() {
            return Cmd::none();
        }
        let outcome = self.handle_key_down(key, index);
        if outcome.disposition != KeyDisposition::Default || key.is_shortcut() {
            return outcome.cmd;
        }
        let action = match (key.digit(), key.code) {
            (Some(d), _) => {
                let mut buf = [0u8; 4];
                self.handle_cell_input(d.encode_utf8(&mut buf), index)
            }
            (None, KeyCode::Backspace | KeyCode::Delete) if self.cells.get(index).is_some() => {
                self.handle_cell_input("", index)
            }
            _ => Cmd::none(),
        };
        outcome.cmd.and(action)
    }

    /// Distribute pasted text from cell `index`.
    ///
    /// Exactly `length` digits pasted into the first cell replace the whole
    /// value; anything else fills from `index`.
    pub fn handle_paste(&mut self, text: &str, index: usize) -> Cmd<OtpMsg> {
        if text.is_empty() {
            return Cmd::none();
        }
        let digits: Vec<char> = text.chars().filter(char::is_ascii_digit).collect();
        if index == 0 && digits.len() == self.cells.len() {
            let _span = self.edit_span("paste_replace");
            self.cells.write(&digits.iter().collect::<String>());
            self.emit_change();
            self.emit_complete();
            return self.focus_cell(self.last_index());
        }
        self.fill_from(&digits, index)
    }

    /// Empty every cell, forget dismissed codes and return focus to the
    /// first cell.
    pub fn clear(&mut self) -> Cmd<OtpMsg> {
        let _span = self.edit_span("clear");
        self.cells.clear();
        self.watcher.clear_dismissed();
        self.watcher.set_status("OTP cleared");
        self.touched = false;
        let focus = self.focus_cell(0);
        self.emit_change();
        if self.config.show_clipboard_detection {
            focus.and(Cmd::after(self.config.recheck_delay, OtpMsg::Recheck))
        } else {
            focus
        }
    }

    // --- form adapter ---

    /// Mark touched, notify the form and validate.
    pub fn mark_as_touched(&mut self) {
        self.touched = true;
        if let Some(on_touched) = self.on_touched.as_mut() {
            on_touched();
        }
        self.revalidate();
    }

    /// The host moved focus onto cell `index`.
    pub fn handle_focus(&mut self, index: usize) {
        if index < self.cells.len() {
            self.focused = Some(index);
        }
    }

    /// Cell `index` lost focus. Touched is decided once focus settles.
    pub fn handle_blur(&mut self, index: usize) -> Cmd<OtpMsg> {
        tracing::trace!(index, "cell blur");
        Cmd::after(self.config.focus_grace, OtpMsg::BlurElapsed)
    }

    fn blur_settled(&mut self, snapshot: FocusSnapshot) {
        if snapshot.is_within(self.id) {
            self.focused = snapshot.focused.map(|cell| cell.index);
            return;
        }
        self.focused = None;
        self.mark_as_touched();
    }

    /// Mark touched and validate, e.g. on form submit.
    pub fn trigger_validation(&mut self) {
        self.touched = true;
        self.revalidate();
    }

    /// No validation error and every cell holds a digit.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_none() && self.cells.is_filled()
    }

    /// Whether the validation error should be shown.
    #[must_use]
    pub fn should_show_error(&self) -> bool {
        self.touched && self.errors.is_some() && self.config.show_validation_errors
    }

    /// Whether cells should be styled as erroneous: pattern errors, or a
    /// required error with every cell empty.
    #[must_use]
    pub fn should_show_input_error(&self) -> bool {
        self.should_show_error()
            && match self.errors {
                Some(ValidationError::Pattern) => true,
                Some(ValidationError::Required) => self.cells.is_empty(),
                _ => false,
            }
    }

    // --- clipboard watcher ---

    /// Request a clipboard read, if detection is enabled.
    #[must_use]
    pub fn check_clipboard(&self) -> Cmd<OtpMsg> {
        if !self.config.show_clipboard_detection {
            return Cmd::none();
        }
        Cmd::read_clipboard(OtpMsg::ClipboardRead)
    }

    /// User-requested check: forgets dismissals and the last read so even
    /// unchanged text is scanned again.
    pub fn manual_check(&mut self) -> Cmd<OtpMsg> {
        if !self.config.show_clipboard_detection {
            return Cmd::none();
        }
        self.watcher.begin_manual_check();
        self.check_clipboard()
    }

    /// Apply a finished clipboard read.
    pub fn handle_clipboard_read(&mut self, result: Result<String, ClipboardError>) {
        if !self.config.show_clipboard_detection {
            return;
        }
        let read_ok = result.is_ok();
        match result {
            Ok(text) => {
                let outcome = self.watcher.observe(text, self.cells.is_empty());
                tracing::trace!(?outcome, "clipboard scanned");
            }
            Err(err) => self.watcher.read_failed(&err),
        }
        self.watcher.finish_manual_check(read_ok);
    }

    /// Scan `text` for a code and update the banner.
    pub fn scan(&mut self, text: &str) -> ScanOutcome {
        self.watcher.scan(text, self.cells.is_empty())
    }

    /// Fill the proposed code, hide the banner and raise completion after
    /// a short delay.
    pub fn accept(&mut self) -> Cmd<OtpMsg> {
        let Some(code) = self.watcher.take_accepted() else {
            return Cmd::none();
        };
        let _span = self.edit_span("accept");
        let digits: Vec<char> = code.chars().collect();
        self.cells.assign_from(&digits, 0);
        let focus = self.focus_cell(self.last_index());
        self.emit_change();
        focus.and(Cmd::after(
            self.config.autofill_complete_delay,
            OtpMsg::AutofillComplete,
        ))
    }

    /// Reject the proposed code. Returns the dismissed code.
    pub fn dismiss(&mut self) -> Option<String> {
        self.watcher.dismiss()
    }

    fn poll_settled(&mut self, snapshot: FocusSnapshot) -> Cmd<OtpMsg> {
        if snapshot.window_focused && self.cells.is_empty() {
            self.check_clipboard()
        } else {
            Cmd::none()
        }
    }

    // --- host events ---

    /// Route a host event to the focused cell.
    ///
    /// Key presses and pastes need a focused cell. `Focus(false)` is a
    /// blur of the focused cell. Clipboard events are treated as a read.
    pub fn handle_event(&mut self, event: &Event) -> Cmd<OtpMsg> {
        if let Event::Clipboard(text) = event {
            self.handle_clipboard_read(Ok(text.clone()));
            return Cmd::none();
        }
        let Some(index) = self.focused else {
            tracing::trace!("event without a focused cell ignored");
            return Cmd::none();
        };
        match event {
            Event::Key(key) => self.handle_key_press(key, index),
            Event::Paste(text) => self.handle_paste(text, index),
            Event::Focus(false) => self.handle_blur(index),
            Event::Focus(true) | Event::Clipboard(_) => Cmd::none(),
        }
    }

    /// Render state.
    #[must_use]
    pub fn view(&self) -> OtpBoxView {
        let input_error = self.should_show_input_error();
        let detection = self.config.show_clipboard_detection;
        let cells = self
            .cells
            .iter()
            .enumerate()
            .map(|(index, value)| CellView {
                id: self.id.cell(index),
                value,
                focused: self.focused == Some(index),
                error: input_error,
            })
            .collect();
        let banner = match self.watcher.banner() {
            Banner::Visible { display, label, .. } if detection => Some(BannerView {
                display: display.clone(),
                label: label.clone(),
            }),
            _ => None,
        };
        OtpBoxView {
            cells,
            banner,
            error: self
                .errors
                .as_ref()
                .filter(|_| self.should_show_error())
                .map(ToString::to_string),
            status: if detection {
                self.watcher.status().to_string()
            } else {
                String::new()
            },
            disabled: self.disabled,
        }
    }
}

impl ValueAccessor for OtpBox {
    fn write_value(&mut self, value: &str) {
        self.write(value);
    }

    fn value(&self) -> String {
        self.cells.value()
    }

    fn register_on_change(&mut self, f: ChangeFn) {
        self.on_change = Some(f);
    }

    fn register_on_touched(&mut self, f: TouchFn) {
        self.on_touched = Some(f);
    }

    fn set_disabled_state(&mut self, disabled: bool) {
        tracing::debug!(widget = %self.id, disabled, "disabled state set");
        self.disabled = disabled;
    }
}

impl Validator for OtpBox {
    fn validate(&self) -> Option<ValidationError> {
        validate_value(
            &self.cells.value(),
            self.cells.len(),
            self.config.required,
            self.touched,
        )
    }
}

impl Model for OtpBox {
    type Message = OtpMsg;

    fn init(&mut self) -> Cmd<OtpMsg> {
        self.mounted = true;
        tracing::debug!(widget = %self.id, length = self.cells.len(), "OTP box mounted");
        let mut cmds = vec![self.check_clipboard()];
        if self.config.auto_focus {
            cmds.push(Cmd::after(self.config.auto_focus_delay, OtpMsg::ApplyFocus(0)));
        }
        Cmd::batch(cmds)
    }

    fn update(&mut self, msg: OtpMsg) -> Cmd<OtpMsg> {
        match msg {
            OtpMsg::Input { index, value } => self.handle_cell_input(&value, index),
            OtpMsg::Key { index, key } => self.handle_key_press(&key, index),
            OtpMsg::Paste { index, text } => self.handle_paste(&text, index),
            OtpMsg::Focused(index) => {
                self.handle_focus(index);
                Cmd::none()
            }
            OtpMsg::Blur(index) => self.handle_blur(index),
            OtpMsg::Event(event) => self.handle_event(&event),
            OtpMsg::SetValue(value) => {
                self.write(&value);
                Cmd::none()
            }
            OtpMsg::Clear => self.clear(),
            OtpMsg::Accept => self.accept(),
            OtpMsg::Dismiss => {
                self.dismiss();
                Cmd::none()
            }
            OtpMsg::CheckClipboard => self.manual_check(),
            OtpMsg::TriggerValidation => {
                self.trigger_validation();
                Cmd::none()
            }
            OtpMsg::ApplyFocus(index) if index < self.cells.len() => {
                self.focused = Some(index);
                Cmd::focus(self.id.cell(index))
            }
            OtpMsg::ApplyFocus(_) => Cmd::none(),
            OtpMsg::BlurElapsed => Cmd::inspect(OtpMsg::BlurSettled),
            OtpMsg::BlurSettled(snapshot) => {
                self.blur_settled(snapshot);
                Cmd::none()
            }
            OtpMsg::PollTick => Cmd::inspect(OtpMsg::PollSettled),
            OtpMsg::PollSettled(snapshot) => self.poll_settled(snapshot),
            OtpMsg::Recheck => self.check_clipboard(),
            OtpMsg::ClipboardRead(result) => {
                self.handle_clipboard_read(result);
                Cmd::none()
            }
            OtpMsg::AutofillComplete => {
                self.emit_complete();
                Cmd::none()
            }
        }
    }

    fn subscriptions(&self) -> Vec<Box<dyn Subscription<OtpMsg>>> {
        if self.mounted && self.config.show_clipboard_detection {
            vec![Box::new(Every::new(self.config.poll_interval, || {
                OtpMsg::PollTick
            }))]
        } else {
            Vec::new()
        }
    }
}
