#![forbid(unsafe_code)]

//! OTP pattern detection in free-form clipboard text.
//!
//! Patterns are tried in a fixed priority order and the first pattern whose
//! first match cleans down to exactly `length` digits wins. Priority beats
//! position: a bare run late in the text is preferred over a labeled code
//! earlier in it.
//!
//! Digit classes are spelled `[0-9]` so that non-ASCII numerals never count
//! as OTP digits.

use std::fmt;

use regex::Regex;

/// Shape of text a pattern recognises, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// `482913`
    Bare,
    /// `482 913`
    Spaced,
    /// `482-913`
    Hyphenated,
    /// `48 29 13`
    Grouped,
    /// `code: 482913`
    Labeled,
    /// `482913 is your code`
    Trailing,
}

impl PatternKind {
    /// All kinds in priority order.
    pub const ALL: [Self; 6] = [
        Self::Bare,
        Self::Spaced,
        Self::Hyphenated,
        Self::Grouped,
        Self::Labeled,
        Self::Trailing,
    ];

    /// Human-readable label for a box of `length` cells.
    #[must_use]
    pub fn label(self, length: usize) -> String {
        match self {
            Self::Bare => format!("Simple {length}-digit"),
            Self::Spaced => "Spaced format".to_string(),
            Self::Hyphenated => "Hyphenated format".to_string(),
            Self::Grouped => "Double-spaced format".to_string(),
            Self::Labeled => "Labeled OTP".to_string(),
            Self::Trailing => "Trailing label".to_string(),
        }
    }

    fn source(self, length: usize) -> Option<String> {
        let head = length / 2;
        let tail = length - head;
        // ASCII boundary: a code glued to a non-ASCII letter still stands alone.
        const B: &str = r"(?-u:\b)";
        match self {
            Self::Bare => Some(format!(r"{B}[0-9]{{{length}}}{B}")),
            Self::Spaced if head > 0 => Some(format!(r"{B}[0-9]{{{head}}}\s+[0-9]{{{tail}}}{B}")),
            Self::Hyphenated if head > 0 => Some(format!(r"{B}[0-9]{{{head}}}-[0-9]{{{tail}}}{B}")),
            Self::Grouped if length >= 4 && length % 2 == 0 => {
                let groups = length / 2;
                Some(format!(r"{B}[0-9]{{2}}(?:\s+[0-9]{{2}}){{{}}}{B}", groups - 1))
            }
            Self::Labeled => Some(format!(r"(?i)(?:otp|code|verification)[\s:]*([0-9]{{{length}}})")),
            Self::Trailing => Some(format!(
                r"(?i)([0-9]{{{length}}})(?:\s*(?:is\s+your|otp|code|verification))"
            )),
            _ => None,
        }
    }
}

/// One compiled detection pattern.
#[derive(Debug, Clone)]
pub struct OtpPattern {
    kind: PatternKind,
    regex: Regex,
}

impl OtpPattern {
    /// What this pattern recognises.
    #[must_use]
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// The compiled expression.
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    fn candidate<'t>(&self, text: &'t str) -> Option<&'t str> {
        let caps = self.regex.captures(text)?;
        caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str())
    }
}

/// A code found in clipboard text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// The digits, formatting stripped.
    pub code: String,
    /// Which pattern produced it.
    pub kind: PatternKind,
}

impl Detection {
    /// Display form of the code.
    #[must_use]
    pub fn display(&self) -> String {
        format_display(&self.code)
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Ordered pattern set for one OTP length.
#[derive(Debug, Clone)]
pub struct OtpDetector {
    length: usize,
    patterns: Vec<OtpPattern>,
}

impl OtpDetector {
    /// Build the pattern set for codes of `length` digits.
    #[must_use]
    pub fn new(length: usize) -> Self {
        let patterns = PatternKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let source = kind.source(length)?;
                match Regex::new(&source) {
                    Ok(regex) => Some(OtpPattern { kind, regex }),
                    Err(err) => {
                        tracing::error!(?kind, %err, "failed to compile OTP pattern");
                        None
                    }
                }
            })
            .collect();
        Self { length, patterns }
    }

    /// Code length this detector matches.
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Patterns in priority order.
    #[must_use]
    pub fn patterns(&self) -> &[OtpPattern] {
        &self.patterns
    }

    /// Find the highest-priority code in `text`.
    #[must_use]
    pub fn scan(&self, text: &str) -> Option<Detection> {
        self.patterns.iter().find_map(|pattern| {
            let code = strip_non_digits(pattern.candidate(text)?);
            (code.len() == self.length).then_some(Detection {
                code,
                kind: pattern.kind,
            })
        })
    }
}

/// Keep only ASCII digits.
#[must_use]
pub fn strip_non_digits(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// First three digits, a space, then the rest. Codes of three digits or
/// fewer are returned unchanged.
#[must_use]
pub fn format_display(code: &str) -> String {
    match code.char_indices().nth(3) {
        Some((split, _)) => format!("{} {}", &code[..split], &code[split..]),
        None => code.to_string(),
    }
}
