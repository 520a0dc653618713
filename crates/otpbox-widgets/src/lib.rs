#![forbid(unsafe_code)]

//! The OTP entry widget for otpbox.
//!
//! [`OtpBox`] is an Elm-style model: mount it in an
//! [`otpbox_runtime::Program`] and feed it host events, or drive it with
//! direct method calls and run the returned commands yourself.

pub mod config;
pub mod otp_box;

pub use config::{ConfigError, DEFAULT_LENGTH, OtpBoxConfig};
pub use otp_box::{
    Banner, BannerView, CellView, ClipboardWatcher, Detection, DigitCells, KeyDisposition,
    KeyOutcome, OtpBox, OtpBoxEvent, OtpBoxView, OtpDetector, OtpMsg, PatternKind, ScanOutcome,
    ValidationError, Validator, ValueAccessor,
};
