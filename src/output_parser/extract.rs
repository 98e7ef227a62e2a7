//! Locating the JSON array inside a free-form model response.
//!
//! This is the first step of every parse: the model is asked to return only
//! a JSON array, but answers regularly arrive wrapped in prose, markdown
//! fences, or reasoning blocks.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// `[`, optional whitespace, `{` ... `}`, optional whitespace, `]`, spanning lines.
/// Greedy, so it runs from the first array-of-objects opening to the last closing.
static ARRAY_OF_OBJECTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[\s*\{.*\}\s*\]").expect("array-of-objects pattern is valid")
});

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Return the most plausible JSON-array text in `raw`.
///
/// Strategies, in order:
/// 1. Content of a `` ```json `` fence (up to the first closing fence after it)
/// 2. The whole trimmed text when it is already bracketed by `[` and `]`
/// 3. The first `[ {...} ]` shaped region anywhere in the text
/// 4. The text itself, unchanged
///
/// `<think>` blocks are removed before any strategy runs. Never fails.
///
/// # Examples
///
/// ```
/// use popm_exam::output_parser::extract_json_array;
///
/// let raw = "Here you go:\n```json\n[{\"text\": \"Q\"}]\n```\nGood luck!";
/// assert_eq!(extract_json_array(raw), "[{\"text\": \"Q\"}]");
/// ```
pub fn extract_json_array(raw: &str) -> String {
    let content = strip_think_tags(raw);

    if let Some(fenced) = json_fence_content(&content) {
        debug!("found JSON within code block");
        return fenced.trim().to_string();
    }

    let trimmed = content.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        debug!("found raw JSON array");
        return trimmed.to_string();
    }

    if let Some(m) = ARRAY_OF_OBJECTS.find(&content) {
        debug!("found JSON-like array of objects inside prose");
        return m.as_str().to_string();
    }

    debug!("could not identify JSON format, returning raw content");
    content
}

/// Text between a `` ```json `` tag and the next closing fence.
///
/// `None` when there is no tagged fence, it is never closed, or it is empty.
fn json_fence_content(text: &str) -> Option<&str> {
    let open = text.find(JSON_FENCE)?;
    let content_start = open + JSON_FENCE.len();
    let close = text[content_start..].find(FENCE)?;
    let content = &text[content_start..content_start + close];
    (!content.trim().is_empty()).then_some(content)
}

/// Strip all `<think>...</think>` and `<thinking>...</thinking>` blocks.
///
/// An unclosed block swallows the rest of the text.
///
/// # Examples
///
/// ```
/// use popm_exam::output_parser::strip_think_tags;
///
/// assert_eq!(strip_think_tags("<think>reasoning</think>[]"), "[]");
/// assert_eq!(strip_think_tags("<thinking>no closing tag"), "");
/// ```
pub fn strip_think_tags(text: &str) -> String {
    let result = strip_tag_variant(text, "<think>", "</think>");
    strip_tag_variant(&result, "<thinking>", "</thinking>")
}

fn strip_tag_variant(text: &str, open: &str, close: &str) -> String {
    let mut result = text.to_string();
    while let Some(start) = result.find(open) {
        match result[start..].find(close) {
            Some(end_offset) => {
                let end = start + end_offset + close.len();
                result.replace_range(start..end, "");
            }
            None => {
                result.truncate(start);
                break;
            }
        }
    }
    result
}
