#![forbid(unsafe_code)]

//! Render model for the OTP box.

use otpbox_core::focus::CellId;

/// One rendered cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellView {
    /// DOM-style identifier, e.g. `otp-3-0`.
    pub id: CellId,
    /// Cell content.
    pub value: Option<char>,
    /// Whether the widget believes this cell has focus.
    pub focused: bool,
    /// Whether the cell is styled as erroneous.
    pub error: bool,
}

impl CellView {
    /// Glyph shown for the cell.
    #[must_use]
    pub fn glyph(&self) -> char {
        self.value.unwrap_or('_')
    }
}

/// Auto-fill proposal as rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerView {
    /// Display form of the proposed code.
    pub display: String,
    /// Pattern label.
    pub label: String,
}

/// Full render state of an OTP box.
///
/// Built by [`OtpBox::view`](super::OtpBox::view) after every mutation; a
/// pure function of widget state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpBoxView {
    /// Cells in order.
    pub cells: Vec<CellView>,
    /// Proposal banner, if showing.
    pub banner: Option<BannerView>,
    /// Validation message, present only when errors are shown.
    pub error: Option<String>,
    /// Clipboard status line; empty when detection is off or nothing
    /// happened yet.
    pub status: String,
    /// Whether the control is disabled.
    pub disabled: bool,
}

impl OtpBoxView {
    /// Plain-text rows for terminal hosts.
    ///
    /// The cell row brackets each cell and marks the focused one with `>`:
    ///
    /// ```text
    /// [4][8][2]>[_][_][_]
    /// ```
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut row = String::new();
        for cell in &self.cells {
            if cell.focused {
                row.push('>');
            }
            let (open, close) = if cell.error { ('{', '}') } else { ('[', ']') };
            row.push(open);
            row.push(cell.glyph());
            row.push(close);
        }
        let mut lines = vec![row];
        if let Some(banner) = &self.banner {
            lines.push(format!("OTP detected: {} ({}) [accept] [dismiss]", banner.display, banner.label));
        }
        if let Some(error) = &self.error {
            lines.push(format!("! {error}"));
        }
        if !self.status.is_empty() {
            lines.push(self.status.clone());
        }
        lines
    }
}
