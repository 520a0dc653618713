#![forbid(unsafe_code)]

//! Form-control contract: value access, touched state and validation.

use std::fmt;

/// Change listener registered by the host form.
pub type ChangeFn = Box<dyn FnMut(&str) + Send>;

/// Touched listener registered by the host form.
pub type TouchFn = Box<dyn FnMut() + Send>;

/// Two-way value binding between a widget and a host form.
pub trait ValueAccessor {
    /// Replace the widget's value from the form. Does not notify listeners.
    fn write_value(&mut self, value: &str);

    /// Current value as the form sees it.
    fn value(&self) -> String;

    /// Register the listener called on every user-driven change.
    fn register_on_change(&mut self, f: ChangeFn);

    /// Register the listener called when the widget becomes touched.
    fn register_on_touched(&mut self, f: TouchFn);

    /// Enable or disable the control.
    fn set_disabled_state(&mut self, disabled: bool);
}

/// A control that can report its own validity.
pub trait Validator {
    /// Validate the current value. `None` means valid.
    fn validate(&self) -> Option<ValidationError>;
}

/// Why the current value is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty while required and touched.
    Required,
    /// Non-empty but shorter than the cell count.
    Incomplete {
        /// Cell count.
        expected: usize,
        /// Characters present.
        actual: usize,
    },
    /// Full length but not all digits.
    Pattern,
}

impl ValidationError {
    /// Stable key for the error kind.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Incomplete { .. } => "incomplete",
            Self::Pattern => "pattern",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "OTP is required"),
            Self::Incomplete { expected, actual } => {
                write!(f, "Please enter all {expected} digits ({actual} entered)")
            }
            Self::Pattern => write!(f, "OTP must contain only digits"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate `value` for a box of `length` cells.
///
/// Rules are checked in order and the first failure wins:
/// required (only once touched), then incomplete, then pattern.
#[must_use]
pub fn validate_value(
    value: &str,
    length: usize,
    required: bool,
    touched: bool,
) -> Option<ValidationError> {
    if value.is_empty() {
        return (required && touched).then_some(ValidationError::Required);
    }
    let actual = value.chars().count();
    if actual < length {
        return Some(ValidationError::Incomplete {
            expected: length,
            actual,
        });
    }
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Some(ValidationError::Pattern);
    }
    None
}
