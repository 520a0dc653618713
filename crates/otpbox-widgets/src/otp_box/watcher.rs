#![forbid(unsafe_code)]

//! Clipboard watcher state: proposal banner, dismissals and status line.
//!
//! The watcher never reads the clipboard itself. The widget asks the
//! runtime for a read and hands the result to [`ClipboardWatcher::observe`]
//! or [`ClipboardWatcher::read_failed`].

use std::collections::HashSet;

use otpbox_core::clipboard::ClipboardError;

use super::detect::{Detection, OtpDetector, format_display, strip_non_digits};

/// Proposal banner.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Banner {
    /// Nothing proposed.
    #[default]
    Hidden,
    /// A code is on offer.
    Visible {
        /// Digits as found.
        code: String,
        /// Display form, e.g. `482 913`.
        display: String,
        /// Label of the pattern that matched.
        label: String,
    },
}

impl Banner {
    /// Whether a proposal is showing.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Visible { .. })
    }
}

/// What a scan decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A code was proposed.
    Proposed(Detection),
    /// No pattern produced a code.
    NoMatch,
    /// A code was found but the cells already hold input.
    AlreadyFilled(Detection),
    /// A code was found but the user dismissed it before.
    Dismissed(Detection),
    /// The text was the same as the previous read.
    Unchanged,
}

/// Clipboard watcher state for one widget.
#[derive(Debug, Clone)]
pub struct ClipboardWatcher {
    detector: OtpDetector,
    dismissed: HashSet<String>,
    last_read: String,
    banner: Banner,
    status: String,
    checked: bool,
    manual_pending: bool,
}

impl ClipboardWatcher {
    /// Watcher for codes of `length` digits.
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self {
            detector: OtpDetector::new(length),
            dismissed: HashSet::new(),
            last_read: String::new(),
            banner: Banner::Hidden,
            status: String::new(),
            checked: false,
            manual_pending: false,
        }
    }

    /// The detector in use.
    #[must_use]
    pub fn detector(&self) -> &OtpDetector {
        &self.detector
    }

    /// Current banner.
    #[must_use]
    pub fn banner(&self) -> &Banner {
        &self.banner
    }

    /// Latest status line.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Replace the status line.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Whether at least one read was attempted.
    #[must_use]
    pub fn checked(&self) -> bool {
        self.checked
    }

    /// Whether `code` was dismissed.
    #[must_use]
    pub fn is_dismissed(&self, code: &str) -> bool {
        self.dismissed.contains(code)
    }

    /// Forget all dismissals.
    pub fn clear_dismissed(&mut self) {
        self.dismissed.clear();
    }

    /// Handle a successful read. Text identical to the previous read is
    /// skipped.
    pub fn observe(&mut self, text: String, cells_empty: bool) -> ScanOutcome {
        self.checked = true;
        if text == self.last_read {
            return ScanOutcome::Unchanged;
        }
        let outcome = self.scan(&text, cells_empty);
        self.last_read = text;
        outcome
    }

    /// Run detection on `text` and update banner and status.
    ///
    /// A found code is proposed only if it was not dismissed and the cells
    /// are empty. Otherwise no-match takes precedence over already-filled.
    pub fn scan(&mut self, text: &str, cells_empty: bool) -> ScanOutcome {
        let Some(detection) = self.detector.scan(text) else {
            self.hide();
            self.status = format!("No {}-digit OTP found in clipboard", self.detector.length());
            return ScanOutcome::NoMatch;
        };
        if self.dismissed.contains(&detection.code) {
            return ScanOutcome::Dismissed(detection);
        }
        if !cells_empty {
            self.status = "OTP fields already filled".to_string();
            return ScanOutcome::AlreadyFilled(detection);
        }
        self.propose(&detection);
        ScanOutcome::Proposed(detection)
    }

    /// Show a proposal.
    pub fn propose(&mut self, detection: &Detection) {
        let label = detection.kind.label(self.detector.length());
        let display = detection.display();
        self.status = format!("Found {label}: {display}");
        self.banner = Banner::Visible {
            code: detection.code.clone(),
            display,
            label,
        };
    }

    /// Hide the banner, keeping status.
    pub fn hide(&mut self) {
        self.banner = Banner::Hidden;
    }

    /// Take the proposed digits for filling, hiding the banner.
    ///
    /// Returns `None` if nothing is proposed or the proposal does not clean
    /// to the configured length.
    pub fn take_accepted(&mut self) -> Option<String> {
        let Banner::Visible { display, .. } = &self.banner else {
            return None;
        };
        let digits = strip_non_digits(display);
        if digits.len() != self.detector.length() {
            return None;
        }
        self.hide();
        self.status = "OTP auto-filled successfully!".to_string();
        Some(digits)
    }

    /// Remember the proposed code as rejected and hide the banner.
    pub fn dismiss(&mut self) -> Option<String> {
        let Banner::Visible { code, .. } = std::mem::take(&mut self.banner) else {
            return None;
        };
        self.dismissed.insert(code.clone());
        self.status = "Auto-fill dismissed".to_string();
        Some(code)
    }

    /// Record a failed read.
    pub fn read_failed(&mut self, err: &ClipboardError) {
        tracing::warn!(error = %err, "clipboard access failed");
        self.checked = true;
        self.status = "Clipboard access denied. Please paste manually.".to_string();
        self.hide();
    }

    /// Prepare a manual re-check: forget dismissals and the last read so the
    /// next read is scanned even if unchanged.
    pub fn begin_manual_check(&mut self) {
        self.dismissed.clear();
        self.last_read.clear();
        self.status = "Checking clipboard...".to_string();
        self.manual_pending = true;
    }

    /// Close a manual check after its read was handled.
    pub fn finish_manual_check(&mut self, read_ok: bool) {
        if !std::mem::take(&mut self.manual_pending) {
            return;
        }
        if read_ok && !self.banner.is_visible() {
            self.status = "No valid OTP found in clipboard".to_string();
        }
    }
}

/// Display form used for the completion status line.
pub(crate) fn entered_status(value: &str) -> String {
    format!("OTP entered: {}", format_display(value))
}
