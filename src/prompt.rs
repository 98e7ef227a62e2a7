//! Prompt templating and the question-generation prompt.

use std::collections::HashMap;

const QUESTION_TEMPLATE: &str = r#"Generate exactly {count} multiple-choice questions for the {exam} certification exam.

Requirements:
1. Each question must be concise and clear
2. Each question must have exactly 4 answer choices
3. Only one answer choice should be marked as correct
4. Keep explanations brief (max {explanation_chars} characters)
5. Focus on these core concepts:
{topics}

Format as a JSON array with the following structure:
[
  {{
    "text": "Brief question text",
    "choices": [
      {{"text": "First option", "correct": false}},
      {{"text": "Second option", "correct": true}},
      {{"text": "Third option", "correct": false}},
      {{"text": "Fourth option", "correct": false}}
    ],
    "explanation": "Short explanation"
  }}
]

IMPORTANT: You must provide exactly {count} questions. Return ONLY the JSON array."#;

/// Substitute `{key}` placeholders in `template` with values from `vars`.
///
/// Use `{{` to insert a literal `{` and `}}` to insert a literal `}`.
/// Unknown placeholders are left as they are.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use popm_exam::prompt::render;
///
/// let vars = HashMap::from([("name".to_string(), "Alice".to_string())]);
/// let result = render("Hello {name}, here is JSON: {{\"key\": \"val\"}}", &vars);
/// assert_eq!(result, r#"Hello Alice, here is JSON: {"key": "val"}"#);
/// ```
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    // Single left-to-right pass: substituted values are never rescanned.
    while let Some(at) = rest.find(['{', '}']) {
        rendered.push_str(&rest[..at]);
        let tail = &rest[at..];

        if let Some(after) = tail.strip_prefix("{{") {
            rendered.push('{');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            rendered.push('}');
            rest = after;
        } else if let Some(value) = placeholder(tail).and_then(|key| vars.get(key)) {
            rendered.push_str(value);
            rest = &tail[tail.find('}').map_or(tail.len(), |end| end + 1)..];
        } else {
            rendered.push_str(&tail[..1]);
            rest = &tail[1..];
        }
    }

    rendered.push_str(rest);
    rendered
}

/// The key of a `{key}` placeholder at the start of `text`.
fn placeholder(text: &str) -> Option<&str> {
    let body = text.strip_prefix('{')?;
    let end = body.find(['{', '}'])?;
    (body[end..].starts_with('}')).then(|| &body[..end])
}

/// Create a numbered list from items (1-indexed).
pub fn numbered_list(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// What the generation prompt asks for, apart from the count.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionPrompt {
    /// Exam name as it appears in the prompt.
    pub exam: String,
    /// Topic areas the questions should cover.
    pub topics: Vec<String>,
    /// Upper bound on explanation length requested from the model.
    pub explanation_chars: usize,
}

impl QuestionPrompt {
    pub fn new(exam: impl Into<String>, topics: Vec<String>) -> Self {
        Self {
            exam: exam.into(),
            topics,
            explanation_chars: 100,
        }
    }

    /// Render the prompt for `count` questions, never asking for more than `cap`.
    pub fn render(&self, count: usize, cap: usize) -> String {
        let count = count.min(cap).max(1);
        let topics = numbered_list(&self.topics)
            .lines()
            .map(|line| format!("   {}", line))
            .collect::<Vec<_>>()
            .join("\n");

        let vars = HashMap::from([
            ("count".to_string(), count.to_string()),
            ("exam".to_string(), self.exam.clone()),
            ("explanation_chars".to_string(), self.explanation_chars.to_string()),
            ("topics".to_string(), topics),
        ]);
        render(QUESTION_TEMPLATE, &vars)
    }
}

impl Default for QuestionPrompt {
    fn default() -> Self {
        Self::new("SAFe POPM (SAFe Product Owner / Product Manager)", default_topics())
    }
}

/// POPM course areas used when no topics are configured.
pub fn default_topics() -> Vec<String> {
    [
        "Product Owner/Product Management roles and responsibilities, the Lean-Agile mindset, Value Streams",
        "PI Planning preparation: the Solution Vision, Solution and PI Roadmaps, Customer Centricity, ART Backlog and Kanban",
        "Leadership for PI Planning: PI Objectives, the ART Planning Board and dependencies, risks",
        "Iteration execution: Iteration Planning, Stories and Story Maps, Team Kanban, Backlog Refinement, Iteration Review and Retrospective, DevOps and Release on Demand",
        "PI execution: PO Sync, Inspect and Adapt, the Innovation and Planning Iteration, the System Demo",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
