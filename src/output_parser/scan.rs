//! Character-level scanning shared by the sanitizer, lenient repair, and the
//! object-span finder.
//!
//! Every pass over model output needs to know whether a character sits inside
//! a double-quoted literal. [`StringTracker`] answers that one character at a
//! time; [`balanced_span`] builds on it to find complete `{...}` objects.

/// Where a character falls relative to double-quoted string literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Structural text outside any literal.
    Outside,
    /// Literal content, including both halves of an escape sequence.
    Inside,
    /// An unescaped `"` that opens or closes a literal.
    Quote,
}

/// Incremental string-literal state.
///
/// A backslash escapes the next character wherever it appears, so `\"` never
/// toggles the literal state and `\\` does not escape what follows it.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringTracker {
    in_string: bool,
    escaped: bool,
}

impl StringTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one character and classify it.
    pub fn advance(&mut self, ch: char) -> Position {
        let here = if self.in_string {
            Position::Inside
        } else {
            Position::Outside
        };

        if self.escaped {
            self.escaped = false;
            return here;
        }

        match ch {
            '\\' => {
                self.escaped = true;
                here
            }
            '"' => {
                self.in_string = !self.in_string;
                Position::Quote
            }
            _ => here,
        }
    }

    /// Whether the scan is currently inside an unterminated literal.
    pub fn in_string(&self) -> bool {
        self.in_string
    }
}

/// Find the end of the balanced `open ... close` region starting at `start`.
///
/// `text[start..]` must begin with `open`. Delimiters inside string literals
/// are ignored. Returns the byte index of the matching `close`, or `None` when
/// the region is never closed (truncated output).
pub fn balanced_span(text: &str, start: usize, open: char, close: char) -> Option<usize> {
    let mut tracker = StringTracker::new();
    let mut depth = 0usize;

    for (i, ch) in text[start..].char_indices() {
        if tracker.advance(ch) != Position::Outside {
            continue;
        }
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(start + i);
            }
        }
    }

    None
}
