#![forbid(unsafe_code)]

//! Widget configuration.
//!
//! [`OtpBoxConfig`] holds the recognised options and the timing knobs of the
//! OTP widget. Every field has a default, so `OtpBoxConfig::default()` is a
//! six-digit box with auto-focus and clipboard detection on.
//!
//! With the `config` feature the configuration can be loaded from TOML or
//! JSON; durations are written in milliseconds:
//!
//! ```toml
//! length = 4
//! required = true
//! poll_interval = 2000
//! ```

use std::fmt;
use std::time::Duration;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Default number of digit cells.
pub const DEFAULT_LENGTH: usize = 6;

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// `length` must be at least 1.
    InvalidLength(usize),
    /// `poll_interval` must be non-zero.
    ZeroPollInterval,
    /// TOML or JSON could not be parsed.
    Parse(String),
    /// Reading a configuration file failed.
    Io(std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength(len) => write!(f, "invalid OTP length {len}: must be at least 1"),
            Self::ZeroPollInterval => write!(f, "poll_interval must be greater than zero"),
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Io(err) => write!(f, "config I/O error: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// OTP widget configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct OtpBoxConfig {
    /// Number of digit cells.
    pub length: usize,
    /// Focus the first cell shortly after mount.
    pub auto_focus: bool,
    /// Watch the clipboard for OTP-shaped text.
    pub show_clipboard_detection: bool,
    /// An empty value is a validation error once touched.
    pub required: bool,
    /// Report validation errors in the rendered view.
    pub show_validation_errors: bool,
    /// Period of the clipboard poll.
    #[cfg_attr(feature = "config", serde(with = "duration_ms"))]
    pub poll_interval: Duration,
    /// How long a blur waits for focus to settle before marking touched.
    #[cfg_attr(feature = "config", serde(with = "duration_ms"))]
    pub focus_grace: Duration,
    /// Delay before auto-focusing the first cell.
    #[cfg_attr(feature = "config", serde(with = "duration_ms"))]
    pub auto_focus_delay: Duration,
    /// Delay between accepting an auto-fill and the completion event.
    #[cfg_attr(feature = "config", serde(with = "duration_ms"))]
    pub autofill_complete_delay: Duration,
    /// Delay before re-checking the clipboard after a clear.
    #[cfg_attr(feature = "config", serde(with = "duration_ms"))]
    pub recheck_delay: Duration,
}

impl Default for OtpBoxConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            auto_focus: true,
            show_clipboard_detection: true,
            required: false,
            show_validation_errors: true,
            poll_interval: Duration::from_secs(2),
            focus_grace: Duration::from_millis(100),
            auto_focus_delay: Duration::from_millis(100),
            autofill_complete_delay: Duration::from_millis(100),
            recheck_delay: Duration::from_millis(100),
        }
    }
}

impl OtpBoxConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of cells (builder).
    #[must_use]
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Set auto-focus (builder).
    #[must_use]
    pub fn with_auto_focus(mut self, auto_focus: bool) -> Self {
        self.auto_focus = auto_focus;
        self
    }

    /// Enable or disable clipboard detection (builder).
    #[must_use]
    pub fn with_clipboard_detection(mut self, enabled: bool) -> Self {
        self.show_clipboard_detection = enabled;
        self
    }

    /// Set whether a value is required (builder).
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set whether validation errors are shown (builder).
    #[must_use]
    pub fn with_validation_errors(mut self, show: bool) -> Self {
        self.show_validation_errors = show;
        self
    }

    /// Set the clipboard poll period (builder).
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the blur settle delay (builder).
    #[must_use]
    pub fn with_focus_grace(mut self, grace: Duration) -> Self {
        self.focus_grace = grace;
        self
    }

    /// Check the configuration for values the widget cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.length == 0 {
            return Err(ConfigError::InvalidLength(self.length));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML.
    #[cfg(feature = "config")]
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[cfg(feature = "config")]
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_widget_contract() {
        let config = OtpBoxConfig::default();
        assert_eq!(config.length, 6);
        assert!(config.auto_focus);
        assert!(config.show_clipboard_detection);
        assert!(!config.required);
        assert!(config.show_validation_errors);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.focus_grace, Duration::from_millis(100));
    }

    #[test]
    fn builder_sets_fields() {
        let config = OtpBoxConfig::new()
            .with_length(4)
            .with_required(true)
            .with_auto_focus(false)
            .with_clipboard_detection(false)
            .with_validation_errors(false);
        assert_eq!(config.length, 4);
        assert!(config.required);
        assert!(!config.auto_focus);
        assert!(!config.show_clipboard_detection);
        assert!(!config.show_validation_errors);
    }

    #[test]
    fn zero_length_is_rejected() {
        let err = OtpBoxConfig::new().with_length(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLength(0)));
        assert_eq!(err.to_string(), "invalid OTP length 0: must be at least 1");
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = OtpBoxConfig::new()
            .with_poll_interval(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroPollInterval));
        assert_eq!(err.to_string(), "poll_interval must be greater than zero");
        assert!(
            OtpBoxConfig::new()
                .with_poll_interval(Duration::from_millis(1))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn length_one_is_accepted() {
        assert!(OtpBoxConfig::new().with_length(1).validate().is_ok());
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_partial_uses_defaults() {
        let config = OtpBoxConfig::from_toml_str("length = 4\nrequired = true\npoll_interval = 500\n")
            .unwrap();
        assert_eq!(config.length, 4);
        assert!(config.required);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert!(config.auto_focus);
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_rejects_zero_length() {
        assert!(matches!(
            OtpBoxConfig::from_toml_str("length = 0"),
            Err(ConfigError::InvalidLength(0))
        ));
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_rejects_zero_poll_interval() {
        assert!(matches!(
            OtpBoxConfig::from_toml_str("poll_interval = 0"),
            Err(ConfigError::ZeroPollInterval)
        ));
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_loads() {
        let config = OtpBoxConfig::from_json_str(r#"{"length": 8, "focus_grace": 250}"#).unwrap();
        assert_eq!(config.length, 8);
        assert_eq!(config.focus_grace, Duration::from_millis(250));
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_round_trip_preserves_durations() {
        let config = OtpBoxConfig::new().with_poll_interval(Duration::from_millis(1500));
        let text = config.to_toml_string().unwrap();
        assert_eq!(OtpBoxConfig::from_toml_str(&text).unwrap(), config);
    }
}
