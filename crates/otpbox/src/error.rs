#![forbid(unsafe_code)]

//! Top-level error type.
//!
//! Each subsystem keeps its own typed error; [`Error`] unifies them so hosts
//! can use `?` across the widget, its clipboard and configuration loading.
//! Nothing here is fatal to a mounted widget: clipboard failures degrade to
//! a status message, and configuration errors happen before mount.

use std::fmt;

use otpbox_core::clipboard::ClipboardError;
use otpbox_widgets::config::ConfigError;

/// Top-level error for otpbox hosts.
#[derive(Debug)]
pub enum Error {
    /// Clipboard access failed.
    Clipboard(ClipboardError),
    /// Widget configuration was rejected or could not be loaded.
    Config(ConfigError),
    /// Raw I/O error, e.g. from a host's input stream.
    Io(std::io::Error),
}

/// Standard result type for otpbox hosts.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Short label for logs and metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Clipboard(_) => "clipboard",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }

    /// Whether the host can keep going.
    ///
    /// Clipboard errors only cost the auto-fill convenience; manual entry
    /// keeps working.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Clipboard(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clipboard(err) => write!(f, "clipboard: {err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "I/O: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Clipboard(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<ClipboardError> for Error {
    fn from(err: ClipboardError) -> Self {
        Self::Clipboard(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
