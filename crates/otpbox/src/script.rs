#![forbid(unsafe_code)]

//! Line-oriented driver for an OTP box.
//!
//! Each line is one [`Command`]:
//!
//! ```text
//! type 4829        key presses on the focused cell
//! paste 482-913    paste into the focused cell
//! key backspace    backspace | delete | left | right | tab | enter | esc
//! focus 2          the user clicks cell 2
//! blur             focus leaves the widget
//! copy 482913      put text on the in-memory clipboard
//! check            manual clipboard check
//! accept | dismiss auto-fill banner buttons
//! clear            empty the box
//! set 4829         form writes a value
//! validate         form submit
//! wait 2000        advance the clock by milliseconds
//! show             print the view
//! quit
//! ```
//!
//! A [`Session`] owns the program and turns commands into output lines.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use otpbox_core::clipboard::{ClipboardReader, MemoryClipboard};
use otpbox_core::event::{Event, KeyCode, KeyEvent};
use otpbox_core::focus::{FocusHost, FocusTracker};
use otpbox_runtime::Program;
use otpbox_widgets::{OtpBox, OtpBoxConfig, OtpBoxEvent, OtpMsg};

use crate::error::Result;

/// One script command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Type each character as a key press.
    Type(String),
    /// Paste text.
    Paste(String),
    /// A single non-character key.
    Key(KeyCode),
    /// Focus a cell.
    Focus(usize),
    /// Move focus out of the widget.
    Blur,
    /// Replace the in-memory clipboard text.
    Copy(String),
    /// Manual clipboard check.
    Check,
    /// Accept the proposal.
    Accept,
    /// Dismiss the proposal.
    Dismiss,
    /// Clear all cells.
    Clear,
    /// Form value write.
    Set(String),
    /// Form submit.
    Validate,
    /// Advance the clock.
    Wait(Duration),
    /// Print the view.
    Show,
    /// Stop reading commands.
    Quit,
}

/// Why a line is not a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// Blank line.
    Empty,
    /// First word is not a command.
    UnknownCommand(String),
    /// Command needs an argument.
    MissingArgument(&'static str),
    /// Argument could not be understood.
    InvalidArgument {
        /// The command.
        command: &'static str,
        /// The offending argument.
        value: String,
    },
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            Self::MissingArgument(cmd) => write!(f, "{cmd}: missing argument"),
            Self::InvalidArgument { command, value } => {
                write!(f, "{command}: invalid argument {value:?}")
            }
        }
    }
}

impl std::error::Error for ScriptError {}

fn parse_key(name: &str) -> Option<KeyCode> {
    let code = match name.to_ascii_lowercase().as_str() {
        "backspace" | "bs" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "tab" => KeyCode::Tab,
        "backtab" | "shift+tab" => KeyCode::BackTab,
        "enter" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Escape,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        _ => return None,
    };
    Some(code)
}

impl FromStr for Command {
    type Err = ScriptError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let required = |name: &'static str| {
            if rest.is_empty() {
                Err(ScriptError::MissingArgument(name))
            } else {
                Ok(rest.to_string())
            }
        };
        let invalid = |command: &'static str| ScriptError::InvalidArgument {
            command,
            value: rest.to_string(),
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(ScriptError::Empty),
            "type" => required("type").map(Self::Type),
            "paste" => required("paste").map(Self::Paste),
            "key" => {
                let name = required("key")?;
                parse_key(&name).map(Self::Key).ok_or_else(|| invalid("key"))
            }
            "focus" => {
                let index = required("focus")?;
                index.parse().map(Self::Focus).map_err(|_| invalid("focus"))
            }
            "blur" => Ok(Self::Blur),
            "copy" => Ok(Self::Copy(rest.to_string())),
            "check" => Ok(Self::Check),
            "accept" => Ok(Self::Accept),
            "dismiss" => Ok(Self::Dismiss),
            "clear" => Ok(Self::Clear),
            "set" => Ok(Self::Set(rest.to_string())),
            "validate" => Ok(Self::Validate),
            "wait" => {
                let ms = required("wait")?;
                ms.parse()
                    .map(|ms| Self::Wait(Duration::from_millis(ms)))
                    .map_err(|_| invalid("wait"))
            }
            "show" => Ok(Self::Show),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ScriptError::UnknownCommand(other.to_string())),
        }
    }
}

/// An OTP box mounted on a virtual clock, driven by [`Command`]s.
pub struct Session {
    program: Program<OtpBox, Box<dyn ClipboardReader>, FocusTracker>,
    memory: Option<MemoryClipboard>,
}

impl Session {
    /// Mount a widget reading from an in-memory clipboard.
    pub fn with_memory_clipboard(config: OtpBoxConfig, clipboard: MemoryClipboard) -> Result<Self> {
        let widget = OtpBox::new(config)?;
        let reader: Box<dyn ClipboardReader> = Box::new(clipboard.clone());
        Ok(Self {
            program: Program::new(widget, reader, FocusTracker::new()),
            memory: Some(clipboard),
        })
    }

    /// Mount a widget reading from `clipboard`.
    pub fn with_clipboard(config: OtpBoxConfig, clipboard: Box<dyn ClipboardReader>) -> Result<Self> {
        let widget = OtpBox::new(config)?;
        Ok(Self {
            program: Program::new(widget, clipboard, FocusTracker::new()),
            memory: None,
        })
    }

    /// The mounted widget.
    #[must_use]
    pub fn widget(&self) -> &OtpBox {
        self.program.model()
    }

    /// The program driving the widget.
    #[must_use]
    pub fn program(&self) -> &Program<OtpBox, Box<dyn ClipboardReader>, FocusTracker> {
        &self.program
    }

    /// Run one command and return event lines.
    ///
    /// Deferred work that is due (focus moves, clipboard reads) runs before
    /// this returns.
    pub fn apply(&mut self, command: Command) -> Vec<String> {
        tracing::debug!(?command, "script command");
        let mut notes = Vec::new();
        match command {
            Command::Type(text) => {
                for ch in text.chars() {
                    self.program
                        .handle_event(Event::Key(KeyEvent::new(KeyCode::Char(ch))));
                    self.program.pump();
                }
            }
            Command::Paste(text) => self.program.handle_event(Event::Paste(text)),
            Command::Key(code) => self.program.handle_event(Event::Key(KeyEvent::new(code))),
            Command::Focus(index) => {
                let cell = self.program.model().id().cell(index);
                self.program.focus_mut().focus(cell);
                self.program.send(OtpMsg::Focused(index));
            }
            Command::Blur => {
                self.program.focus_mut().focus_elsewhere();
                self.program.handle_event(Event::Focus(false));
            }
            Command::Copy(text) => match &self.memory {
                Some(memory) => memory.set_text(text),
                None => {
                    tracing::warn!("copy ignored: the session does not own its clipboard");
                    notes.push("copy: not available with this clipboard".to_string());
                }
            },
            Command::Check => self.program.send(OtpMsg::CheckClipboard),
            Command::Accept => self.program.send(OtpMsg::Accept),
            Command::Dismiss => self.program.send(OtpMsg::Dismiss),
            Command::Clear => self.program.send(OtpMsg::Clear),
            Command::Set(value) => self.program.send(OtpMsg::SetValue(value)),
            Command::Validate => self.program.send(OtpMsg::TriggerValidation),
            Command::Wait(dt) => self.program.advance(dt),
            Command::Show | Command::Quit => {}
        }
        self.program.pump();
        notes.extend(self.drain_events());
        notes
    }

    fn drain_events(&mut self) -> Vec<String> {
        self.program
            .model_mut()
            .take_events()
            .into_iter()
            .map(|event| match event {
                OtpBoxEvent::Change(value) => format!("change: {value:?}"),
                OtpBoxEvent::Complete(value) => format!("complete: {value:?}"),
            })
            .collect()
    }

    /// Render the widget as text rows.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        self.program.model().view().lines()
    }

    /// Unmount the widget.
    pub fn teardown(&mut self) {
        self.program.teardown();
    }
}
