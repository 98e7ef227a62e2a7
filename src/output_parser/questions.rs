//! Tolerant decoding of generated question batches.
//!
//! Generated batches are usually *mostly* well-formed: one object with an
//! unescaped quote or a control character, or a final object cut off at the
//! token limit. Decoding each question object on its own means one defect
//! costs one question instead of the whole batch.

use serde_json::Value;
use tracing::{debug, warn};

use super::extract::extract_json_array;
use super::lenient::repair_lenient;
use super::sanitize::sanitize;
use super::scan::balanced_span;
use crate::diagnostics::{ParseReport, ParseStrategy};
use crate::question::Question;

/// Questions recovered from one response, with the report describing how.
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub questions: Vec<Question>,
    pub report: ParseReport,
}

/// Run the full pipeline on a raw model response:
/// [`extract_json_array`] → [`sanitize`] → [`parse_questions`].
///
/// # Examples
///
/// ```
/// use popm_exam::output_parser::questions_from_response;
///
/// let raw = r#"Here are your questions:
/// [
///   {"text": "What does ART stand for?",
///    "choices": [{"text": "Agile Release Train", "correct": true},
///                {"text": "Agile Review Team", "correct": false},],
///    "explanation": "An ART is a long-lived team of Agile teams."},
/// ]"#;
///
/// let batch = questions_from_response(raw, 1);
/// assert_eq!(batch.questions.len(), 1);
/// assert_eq!(batch.questions[0].choices.len(), 2);
/// ```
pub fn questions_from_response(raw: &str, expected: usize) -> ParsedBatch {
    let candidate = extract_json_array(raw);
    let sanitized = sanitize(&candidate);
    debug!("sanitized JSON: {}", sanitized);
    parse_questions(&sanitized, expected)
}

/// Decode sanitized text into questions. Never fails.
///
/// 1. **Streaming pass**: every balanced `{...}` span that mentions `text`
///    and, later, `explanation` is decoded on its own (strictly, then after
///    [`repair_lenient`]). Spans that fail are skipped and scanning resumes
///    just inside them, so nested or swallowed objects are still found.
/// 2. **Whole-array pass**: only when step 1 recovers nothing, the whole text
///    is decoded as an array of questions (strictly, then leniently).
///
/// The result may hold fewer than `expected` questions, or none.
pub fn parse_questions(sanitized: &str, expected: usize) -> ParsedBatch {
    let mut report = ParseReport::new(expected);

    let mut questions = stream_objects(sanitized, &mut report);
    if !questions.is_empty() {
        report.strategy = Some(ParseStrategy::Streaming);
        debug!("parsed {} questions using streaming pass", questions.len());
    } else {
        questions = decode_whole_array(sanitized, &mut report);
        if !questions.is_empty() {
            report.strategy = Some(ParseStrategy::WholeArray);
            debug!("parsed {} questions using whole-array pass", questions.len());
        }
    }

    for (i, q) in questions.iter().enumerate() {
        if !q.is_well_formed() {
            report.malformed += 1;
            debug!(
                "question {} has {} choices and {} marked correct",
                i + 1,
                q.choices.len(),
                q.choices.iter().filter(|c| c.correct).count()
            );
        }
    }

    report.parsed = questions.len();
    if !report.is_empty() && report.is_short() {
        warn!(
            "expected {} questions but parsed only {}; the response may have been truncated or malformed",
            expected, report.parsed
        );
    }

    ParsedBatch { questions, report }
}

fn stream_objects(text: &str, report: &mut ParseReport) -> Vec<Question> {
    let mut questions = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('{') {
        let start = cursor + offset;
        let Some(end) = balanced_span(text, start, '{', '}') else {
            cursor = start + 1;
            continue;
        };

        let span = &text[start..=end];
        if !is_question_shaped(span) {
            cursor = start + 1;
            continue;
        }

        report.candidates += 1;
        match decode_question(span) {
            Some((question, repaired)) => {
                if repaired {
                    report.repaired += 1;
                }
                questions.push(question);
                cursor = end + 1;
            }
            None => {
                report.skipped += 1;
                cursor = start + 1;
            }
        }
    }

    questions
}

/// Cheap pre-filter: `text` followed somewhere later by `explanation`.
///
/// The words may sit inside string values, so [`decode_question`] still
/// checks the keys on the decoded object.
fn is_question_shaped(span: &str) -> bool {
    span.find("text")
        .is_some_and(|at| span[at..].contains("explanation"))
}

/// Returns the question and whether lenient repair was needed.
///
/// The span must decode to an object with top-level `text` and
/// `explanation` keys. A choice object such as
/// `{"text": "No explanation", "correct": false}` is not a question.
fn decode_question(span: &str) -> Option<(Question, bool)> {
    let (value, repaired) = match serde_json::from_str::<Value>(span) {
        Ok(value) => (value, false),
        Err(strict) => {
            let lenient =
                repair_lenient(span).and_then(|fixed| serde_json::from_str::<Value>(&fixed).ok());
            match lenient {
                Some(value) => (value, true),
                None => {
                    debug!("failed to parse individual question: {}", strict);
                    return None;
                }
            }
        }
    };

    if !has_question_keys(&value) {
        debug!("skipping object without top-level text and explanation keys");
        return None;
    }

    match serde_json::from_value::<Question>(value) {
        Ok(question) => Some((question, repaired)),
        Err(e) => {
            debug!("failed to parse individual question: {}", e);
            None
        }
    }
}

fn has_question_keys(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.contains_key("text") && obj.contains_key("explanation"))
}

fn decode_whole_array(text: &str, report: &mut ParseReport) -> Vec<Question> {
    match serde_json::from_str::<Vec<Question>>(text) {
        Ok(questions) => questions,
        Err(strict) => {
            let lenient = repair_lenient(text)
                .and_then(|fixed| serde_json::from_str::<Vec<Question>>(&fixed).ok());
            match lenient {
                Some(questions) => {
                    report.repaired = questions.len();
                    questions
                }
                None => {
                    debug!("failed to parse with whole-array pass: {}", strict);
                    Vec::new()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::Choice;

    fn question(n: usize) -> Question {
        Question::new(
            format!("Question {n}: what happens in PI Planning?"),
            vec![
                Choice::new("Teams align on objectives", true),
                Choice::new("Budgets are approved", false),
                Choice::new("Stories are estimated in hours", false),
                Choice::new("Nothing", false),
            ],
            format!("Explanation {n}"),
        )
    }

    fn batch_text(count: usize) -> String {
        let qs: Vec<Question> = (1..=count).map(question).collect();
        serde_json::to_string_pretty(&qs).unwrap()
    }

    #[test]
    fn well_formed_array_yields_every_question_in_order() {
        let batch = questions_from_response(&batch_text(3), 3);
        assert_eq!(batch.questions, (1..=3).map(question).collect::<Vec<_>>());
        assert_eq!(batch.report.strategy, Some(ParseStrategy::Streaming));
        assert_eq!(batch.report.candidates, 3);
        assert_eq!(batch.report.skipped, 0);
        assert!(!batch.report.is_short());
    }

    #[test]
    fn one_defective_object_costs_one_question() {
        let raw = batch_text(3).replace("Question 2:", "Question\t2:");
        let batch = questions_from_response(&raw, 3);
        let texts: Vec<&str> = batch.questions.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts.len(), 2);
        assert!(texts[0].starts_with("Question 1"));
        assert!(texts[1].starts_with("Question 3"));
        assert_eq!(batch.report.skipped, 1);
        assert!(batch.report.is_short());
    }

    #[test]
    fn choice_mentioning_explanation_is_not_a_question() {
        let raw = r#"[
  {"text": "Q1?", "choices": [{"text": "A", "correct": true}, {"text": "B", "correct": false}], "explanation": "E1"},
  {"text": "Q2	broken?", "choices": [{"text": "No explanation is needed", "correct": false}, {"text": "Yes", "correct": true}], "explanation": "E2"},
  {"text": "Q3?", "choices": [{"text": "C", "correct": true}, {"text": "D", "correct": false}], "explanation": "E3"}
]"#;
        let batch = questions_from_response(raw, 3);
        let texts: Vec<&str> = batch.questions.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["Q1?", "Q3?"]);
        assert!(batch.questions.iter().all(|q| q.choices.len() == 2));
        assert_eq!(batch.report.skipped, 2);
    }

    #[test]
    fn unescaped_quotes_in_one_object_do_not_hide_the_next() {
        let raw = batch_text(3).replace("Explanation 2", "The \"Vision\" matters");
        let batch = questions_from_response(&raw, 3);
        assert_eq!(batch.questions.len(), 2);
        assert_eq!(batch.questions[1].explanation, "Explanation 3");
    }

    #[test]
    fn literal_newline_in_string_becomes_space() {
        let raw = r#"[{"text": "Line one
line two", "choices": [], "explanation": "e"}]"#;
        let batch = questions_from_response(raw, 1);
        assert_eq!(batch.questions[0].text, "Line one line two");
    }

    #[test]
    fn trailing_commas_parse_like_clean_input() {
        let clean = r#"[{"text": "a", "choices": [{"text": "x", "correct": true}], "explanation": "e"}]"#;
        let dirty = r#"[{"text": "a", "choices": [{"text": "x", "correct": true},], "explanation": "e",},]"#;
        assert_eq!(
            questions_from_response(clean, 1).questions,
            questions_from_response(dirty, 1).questions
        );
    }

    #[test]
    fn truncated_last_object_keeps_earlier_ones() {
        let full = batch_text(3);
        let cut = &full[..full.rfind("Explanation 3").unwrap()];
        let batch = questions_from_response(cut, 3);
        assert_eq!(batch.questions.len(), 2);
    }

    #[test]
    fn wrapper_object_is_looked_through() {
        let sanitized = format!(r#"[{{"questions": {}}}]"#, batch_text(2));
        let batch = parse_questions(&sanitized, 2);
        assert_eq!(batch.questions.len(), 2);
        assert_eq!(batch.report.skipped, 1);
    }

    #[test]
    fn lenient_object_is_repaired() {
        let raw = "[{'text': 'Who owns the ART Backlog?', 'choices': [{'text': 'PM', 'correct': True}], 'explanation': 'Product Management'}]";
        let batch = questions_from_response(raw, 1);
        assert_eq!(batch.questions.len(), 1);
        assert!(batch.questions[0].choices[0].correct);
        assert_eq!(batch.report.repaired, 1);
    }

    #[test]
    fn objects_without_explanation_use_whole_array_pass() {
        let raw = r#"[{"text": "a", "choices": []}, {"text": "b", "choices": []}]"#;
        let batch = questions_from_response(raw, 2);
        assert_eq!(batch.questions.len(), 2);
        assert_eq!(batch.report.strategy, Some(ParseStrategy::WholeArray));
        assert_eq!(batch.questions[1].explanation, "");
    }

    #[test]
    fn garbage_yields_nothing() {
        let batch = questions_from_response("Sorry, I can't generate questions right now.", 5);
        assert!(batch.questions.is_empty());
        assert!(batch.report.strategy.is_none());
        assert!(batch.report.is_empty());
    }

    #[test]
    fn malformed_questions_are_counted_not_rejected() {
        let raw = r#"[{"text": "a", "choices": [{"text": "x", "correct": false}], "explanation": "e"}]"#;
        let batch = questions_from_response(raw, 1);
        assert_eq!(batch.questions.len(), 1);
        assert_eq!(batch.report.malformed, 1);
    }
}
