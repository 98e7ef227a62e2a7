//! Multiple-choice question model.
//!
//! The same types double as the wire schema requested from the model:
//! `{"text": .., "choices": [{"text": .., "correct": ..}], "explanation": ..}`.

use serde::{Deserialize, Serialize};

/// Number of answer choices the prompt asks the model for.
pub const EXPECTED_CHOICES: usize = 4;

/// A single answer option owned by its [`Question`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

impl Choice {
    pub fn new(text: impl Into<String>, correct: bool) -> Self {
        Self {
            text: text.into(),
            correct,
        }
    }
}

/// A multiple-choice question with its explanation.
///
/// Constructed by the tolerant parser or the static fallback set and never
/// mutated afterwards; the bank hands out clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    pub fn new(text: impl Into<String>, choices: Vec<Choice>, explanation: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices,
            explanation: explanation.into(),
        }
    }

    /// The first choice flagged as correct, if any.
    pub fn correct_choice(&self) -> Option<&Choice> {
        self.choices.iter().find(|c| c.correct)
    }

    /// Zero-based index of the first correct choice.
    pub fn correct_index(&self) -> Option<usize> {
        self.choices.iter().position(|c| c.correct)
    }

    /// Whether the question honours the prompt contract: four choices,
    /// exactly one of them correct. Nothing rejects questions that fail this.
    pub fn is_well_formed(&self) -> bool {
        self.choices.len() == EXPECTED_CHOICES
            && self.choices.iter().filter(|c| c.correct).count() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Question {
        Question::new(
            "Who owns the Team Backlog?",
            vec![
                Choice::new("Scrum Master", false),
                Choice::new("Product Owner", true),
                Choice::new("RTE", false),
                Choice::new("Business Owner", false),
            ],
            "The PO owns and prioritizes the Team Backlog.",
        )
    }

    #[test]
    fn correct_choice_returns_flagged_option() {
        let q = sample();
        assert_eq!(q.correct_choice().map(|c| c.text.as_str()), Some("Product Owner"));
        assert_eq!(q.correct_index(), Some(1));
        assert!(q.is_well_formed());
    }

    #[test]
    fn correct_choice_returns_first_when_several_flagged() {
        let mut q = sample();
        q.choices[3].correct = true;
        assert_eq!(q.correct_index(), Some(1));
        assert!(!q.is_well_formed());
    }

    #[test]
    fn correct_choice_none_when_nothing_flagged() {
        let mut q = sample();
        q.choices[1].correct = false;
        assert!(q.correct_choice().is_none());
    }

    #[test]
    fn missing_optional_fields_default() {
        let q: Question = serde_json::from_str(r#"{"text": "bare"}"#).unwrap();
        assert!(q.choices.is_empty());
        assert_eq!(q.explanation, "");

        let c: Choice = serde_json::from_str(r#"{"text": "x"}"#).unwrap();
        assert!(!c.correct);
    }

    #[test]
    fn missing_text_is_rejected() {
        let result: Result<Question, _> = serde_json::from_str(r#"{"explanation": "e"}"#);
        assert!(result.is_err());
    }
}
