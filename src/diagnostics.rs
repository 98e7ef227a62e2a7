//! Parse diagnostics for generated question batches.
//!
//! [`ParseReport`] records what the tolerant parser did with one response:
//! which pass produced the questions, how many candidate objects it looked
//! at, how many it had to skip or repair, and whether the batch came up short.

use std::fmt;

/// Which parsing pass produced the questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Per-object decoding of balanced `{...}` spans.
    Streaming,
    /// Decoding the whole sanitized text as one array.
    WholeArray,
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseStrategy::Streaming => f.write_str("streaming"),
            ParseStrategy::WholeArray => f.write_str("whole-array"),
        }
    }
}

/// Records what happened while parsing one generated batch.
///
/// # Example
///
/// ```
/// use popm_exam::diagnostics::ParseReport;
///
/// let report = ParseReport::new(5);
/// assert!(report.is_empty());
/// assert!(report.is_short());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Pass that produced the questions; `None` when nothing was recovered.
    pub strategy: Option<ParseStrategy>,

    /// Number of questions the prompt asked for.
    pub expected: usize,

    /// Number of questions recovered.
    pub parsed: usize,

    /// Question-shaped spans the streaming pass tried to decode.
    pub candidates: usize,

    /// Candidates dropped because neither strict nor lenient decoding worked.
    pub skipped: usize,

    /// Questions that only decoded after lenient repair.
    pub repaired: usize,

    /// Recovered questions that break the four-choices / one-correct contract.
    pub malformed: usize,
}

impl ParseReport {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            ..Default::default()
        }
    }

    /// Nothing was recovered.
    pub fn is_empty(&self) -> bool {
        self.parsed == 0
    }

    /// Fewer questions than requested. A warning condition, never an error.
    pub fn is_short(&self) -> bool {
        self.parsed < self.expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_report_is_empty_and_short() {
        let r = ParseReport::new(3);
        assert!(r.is_empty());
        assert!(r.is_short());
        assert!(r.strategy.is_none());
    }

    #[test]
    fn full_batch_is_not_short() {
        let r = ParseReport {
            strategy: Some(ParseStrategy::Streaming),
            expected: 2,
            parsed: 2,
            candidates: 2,
            ..Default::default()
        };
        assert!(!r.is_short());
        assert!(!r.is_empty());
    }

    #[test]
    fn strategy_display() {
        assert_eq!(ParseStrategy::WholeArray.to_string(), "whole-array");
    }
}
