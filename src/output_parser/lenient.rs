//! Lenient-syntax repair for question objects that strict JSON rejects.
//!
//! Models occasionally answer in "JSON-ish": `//` comments, single-quoted
//! strings, bare keys, Python literals, or escapes such as `\'` that JSON
//! does not define. [`repair_lenient`] rewrites those into strict JSON so the
//! tolerant parser can give a rejected object a second chance. No regex is
//! used; every pass walks characters with a [`StringTracker`].

use super::scan::{Position, StringTracker};

/// Rewrite lenient syntax into strict JSON.
///
/// Returns `Some(repaired)` only when the input was invalid and the repaired
/// text parses. Returns `None` for already-valid or unrepairable input.
///
/// Passes applied (in order):
/// 1. Strip `//` and `/* */` comments
/// 2. Convert single-quoted strings to double-quoted
/// 3. Quote bare object keys
/// 4. `True` / `False` / `None` to `true` / `false` / `null`
/// 5. Drop backslashes in front of characters JSON cannot escape
///
/// # Examples
///
/// ```
/// use popm_exam::output_parser::repair_lenient;
///
/// let fixed = repair_lenient("{text: 'PI Planning', correct: True}").unwrap();
/// assert_eq!(fixed, r#"{"text": "PI Planning", "correct": true}"#);
/// ```
pub fn repair_lenient(text: &str) -> Option<String> {
    if serde_json::from_str::<serde_json::Value>(text).is_ok() {
        return None;
    }

    let mut s = strip_comments(text);
    s = double_quote_literals(&s);
    s = quote_bare_keys(&s);
    s = replace_python_literals(&s);
    s = drop_invalid_escapes(&s);

    serde_json::from_str::<serde_json::Value>(&s).ok().map(|_| s)
}

fn strip_comments(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let mut result = String::with_capacity(s.len());
    let mut tracker = StringTracker::new();
    let mut i = 0;

    while i < len {
        let outside = !tracker.in_string();
        if outside && chars[i] == '/' && i + 1 < len {
            match chars[i + 1] {
                '/' => {
                    while i < len && chars[i] != '\n' {
                        i += 1;
                    }
                    continue;
                }
                '*' => {
                    i += 2;
                    while i + 1 < len && !(chars[i] == '*' && chars[i + 1] == '/') {
                        i += 1;
                    }
                    i = (i + 2).min(len);
                    continue;
                }
                _ => {}
            }
        }
        tracker.advance(chars[i]);
        result.push(chars[i]);
        i += 1;
    }
    result
}

/// `'value'` → `"value"` when the quotes sit at token boundaries, so
/// apostrophes inside words are left alone.
fn double_quote_literals(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut tracker = StringTracker::new();
    let mut i = 0;

    while i < chars.len() {
        if !tracker.in_string() && chars[i] == '\'' && opens_token(&chars, i) {
            if let Some(close) = closing_single_quote(&chars, i + 1) {
                if closes_token(&chars, close) {
                    result.push('"');
                    let mut j = i + 1;
                    while j < close {
                        match (chars[j], chars.get(j + 1)) {
                            ('\\', Some('\'')) => {
                                result.push('\'');
                                j += 2;
                                continue;
                            }
                            ('"', _) => result.push_str("\\\""),
                            (c, _) => result.push(c),
                        }
                        j += 1;
                    }
                    result.push('"');
                    i = close + 1;
                    continue;
                }
            }
        }
        tracker.advance(chars[i]);
        result.push(chars[i]);
        i += 1;
    }
    result
}

fn opens_token(chars: &[char], i: usize) -> bool {
    match chars[..i].iter().rev().find(|c| !c.is_whitespace()) {
        None => true,
        Some(c) => matches!(c, '{' | '[' | ':' | ','),
    }
}

fn closes_token(chars: &[char], i: usize) -> bool {
    match chars[i + 1..].iter().find(|c| !c.is_whitespace()) {
        None => true,
        Some(c) => matches!(c, '}' | ']' | ':' | ','),
    }
}

fn closing_single_quote(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '\'' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// `{key: 1}` → `{"key": 1}`.
fn quote_bare_keys(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let mut result = String::with_capacity(s.len() + 16);
    let mut tracker = StringTracker::new();
    let mut i = 0;

    while i < len {
        let ch = chars[i];
        let pos = tracker.advance(ch);
        result.push(ch);
        i += 1;

        if pos != Position::Outside || !(ch == '{' || ch == ',') {
            continue;
        }

        while i < len && chars[i].is_whitespace() {
            result.push(chars[i]);
            i += 1;
        }
        if i >= len || !(chars[i].is_alphabetic() || chars[i] == '_') {
            continue;
        }

        let key_start = i;
        while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
            i += 1;
        }
        let key_end = i;
        let mut after = i;
        while after < len && chars[after].is_whitespace() {
            after += 1;
        }

        if after < len && chars[after] == ':' {
            result.push('"');
            result.extend(&chars[key_start..key_end]);
            result.push('"');
        } else {
            result.extend(&chars[key_start..key_end]);
        }
    }
    result
}

fn replace_python_literals(s: &str) -> String {
    const LITERALS: [(&str, &str); 3] = [("True", "true"), ("False", "false"), ("None", "null")];

    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut tracker = StringTracker::new();
    let mut i = 0;

    'scan: while i < chars.len() {
        if !tracker.in_string() && (i == 0 || !chars[i - 1].is_alphanumeric()) {
            for (from, to) in LITERALS {
                let n = from.len();
                let word_matches = chars.len() >= i + n
                    && chars[i..i + n].iter().copied().eq(from.chars())
                    && chars.get(i + n).map_or(true, |c| !c.is_alphanumeric());
                if word_matches {
                    result.push_str(to);
                    i += n;
                    continue 'scan;
                }
            }
        }
        tracker.advance(chars[i]);
        result.push(chars[i]);
        i += 1;
    }
    result
}

/// Inside literals, `\x` for any `x` JSON cannot escape becomes plain `x`.
fn drop_invalid_escapes(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if in_string && ch == '\\' {
            match chars.get(i + 1) {
                Some(next) if matches!(next, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u') => {
                    result.push(ch);
                    result.push(*next);
                    i += 2;
                }
                _ => i += 1,
            }
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
        }
        result.push(ch);
        i += 1;
    }
    result
}
