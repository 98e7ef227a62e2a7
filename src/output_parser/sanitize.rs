//! Repairs applied to extracted question-array text before decoding.
//!
//! Three malformations show up again and again in generated batches:
//! trailing commas, raw line breaks inside string values, and output cut off
//! mid-string or without its enclosing brackets.

use super::scan::{Position, StringTracker};

/// Sanitize candidate array text. Never fails.
///
/// Steps, in order:
/// 1. Empty input becomes `[]`
/// 2. Commas followed only by whitespace and `}` or `]` are dropped
/// 3. Raw `\n` / `\r` inside string literals become a single space each
/// 4. A literal still open at the end gets a closing `"`
/// 5. The result is wrapped in `[` / `]` where either is missing
///
/// # Examples
///
/// ```
/// use popm_exam::output_parser::sanitize;
///
/// assert_eq!(sanitize(""), "[]");
/// assert_eq!(sanitize(r#"{"text": "a",}"#), r#"[{"text": "a"}]"#);
/// assert_eq!(sanitize("[{\"text\": \"line\nbreak\"}]"), r#"[{"text": "line break"}]"#);
/// ```
pub fn sanitize(text: &str) -> String {
    if text.is_empty() {
        return "[]".to_string();
    }

    let without_commas = remove_trailing_commas(text);
    let flattened = fold_string_line_breaks(&without_commas);
    ensure_array_brackets(&flattened)
}

/// Drop commas that are followed (past whitespace) by `}` or `]`.
///
/// Commas inside string literals are kept.
fn remove_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut tracker = StringTracker::new();

    for (i, &ch) in chars.iter().enumerate() {
        if tracker.advance(ch) == Position::Outside && ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        result.push(ch);
    }
    result
}

/// Replace raw line breaks inside literals with spaces, then close a literal
/// left open by truncation.
fn fold_string_line_breaks(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 1);
    let mut tracker = StringTracker::new();

    for ch in s.chars() {
        let pos = tracker.advance(ch);
        if pos == Position::Inside && (ch == '\n' || ch == '\r') {
            result.push(' ');
        } else {
            result.push(ch);
        }
    }

    if tracker.in_string() {
        result.push('"');
    }
    result
}

fn ensure_array_brackets(s: &str) -> String {
    let trimmed = s.trim();
    let mut result = String::with_capacity(trimmed.len() + 2);
    if !trimmed.starts_with('[') {
        result.push('[');
    }
    result.push_str(trimmed);
    if !trimmed.ends_with(']') {
        result.push(']');
    }
    result
}
