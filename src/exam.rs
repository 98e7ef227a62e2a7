//! A single linear exam session over a shuffled subset of questions.

use thiserror::Error;

use crate::question::{Choice, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExamState {
    #[default]
    Idle,
    InProgress,
    Finished,
}

/// Why an answer was not accepted. The session does not advance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("No exam is currently in progress. Use 'start-exam' to begin.")]
    NotInProgress,
    #[error("Invalid choice number. Please select a number between 1 and {choices}")]
    OutOfRange { choices: usize },
}

/// Result of answering the current question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerFeedback {
    pub correct: bool,
    /// `None` when the generated question had no choice marked correct.
    pub correct_choice: Option<Choice>,
    pub explanation: String,
    /// The answered question was the last one.
    pub finished: bool,
}

#[derive(Debug, Default)]
pub struct ExamSession {
    state: ExamState,
    questions: Vec<Question>,
    current: usize,
    correct_answers: usize,
}

impl ExamSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over with up to `count` questions drawn at random from `pool`.
    pub fn start(&mut self, pool: Vec<Question>, count: usize) {
        self.start_with_rng(pool, count, &mut fastrand::Rng::new());
    }

    /// [`start`](Self::start) with a caller-supplied generator, for reproducible order.
    pub fn start_with_rng(&mut self, mut pool: Vec<Question>, count: usize, rng: &mut fastrand::Rng) {
        rng.shuffle(&mut pool);
        pool.truncate(count.min(pool.len()));

        self.state = if pool.is_empty() {
            ExamState::Finished
        } else {
            ExamState::InProgress
        };
        self.questions = pool;
        self.current = 0;
        self.correct_answers = 0;
    }

    pub fn state(&self) -> ExamState {
        self.state
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == ExamState::InProgress
    }

    pub fn current_question(&self) -> Option<&Question> {
        if self.is_in_progress() {
            self.questions.get(self.current)
        } else {
            None
        }
    }

    /// 1-based position of the current question.
    pub fn current_number(&self) -> usize {
        self.current + 1
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn correct_answers(&self) -> usize {
        self.correct_answers
    }

    /// Percentage of correct answers over all questions in the session.
    pub fn score(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        self.correct_answers as f64 / self.questions.len() as f64 * 100.0
    }

    /// Answer the current question with the 0-based `choice` index.
    pub fn submit_answer(&mut self, choice: usize) -> Result<AnswerFeedback, AnswerError> {
        let question = self.current_question().ok_or(AnswerError::NotInProgress)?;
        let picked = question.choices.get(choice).ok_or(AnswerError::OutOfRange {
            choices: question.choices.len(),
        })?;

        let correct = picked.correct;
        let correct_choice = question.correct_choice().cloned();
        let explanation = question.explanation.clone();

        if correct {
            self.correct_answers += 1;
        }
        self.current += 1;
        if self.current >= self.questions.len() {
            self.state = ExamState::Finished;
        }

        Ok(AnswerFeedback {
            correct,
            correct_choice,
            explanation,
            finished: self.state == ExamState::Finished,
        })
    }

    /// Stop early. Returns `false` if no exam was running.
    pub fn end(&mut self) -> bool {
        let was_running = self.is_in_progress();
        if was_running {
            self.state = ExamState::Finished;
        }
        was_running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| {
                Question::new(
                    format!("q{i}"),
                    vec![Choice::new("right", true), Choice::new("wrong", false)],
                    format!("e{i}"),
                )
            })
            .collect()
    }

    #[test]
    fn start_takes_at_most_the_pool() {
        let mut exam = ExamSession::new();
        exam.start(pool(3), 10);
        assert_eq!(exam.total_questions(), 3);
        assert!(exam.is_in_progress());
        assert_eq!(exam.current_number(), 1);
    }

    #[test]
    fn start_with_seeded_rng_is_reproducible() {
        let mut a = ExamSession::new();
        let mut b = ExamSession::new();
        a.start_with_rng(pool(10), 4, &mut fastrand::Rng::with_seed(7));
        b.start_with_rng(pool(10), 4, &mut fastrand::Rng::with_seed(7));
        assert_eq!(a.current_question(), b.current_question());
    }

    #[test]
    fn answering_every_question_finishes_and_scores() {
        let mut exam = ExamSession::new();
        exam.start(pool(2), 2);

        let first = exam.submit_answer(0).unwrap();
        assert!(first.correct);
        assert!(!first.finished);

        let second = exam.submit_answer(1).unwrap();
        assert!(!second.correct);
        assert_eq!(second.correct_choice.unwrap().text, "right");
        assert!(second.finished);

        assert_eq!(exam.state(), ExamState::Finished);
        assert_eq!(exam.correct_answers(), 1);
        assert_eq!(exam.score(), 50.0);
        assert!(exam.current_question().is_none());
    }

    #[test]
    fn out_of_range_answer_does_not_advance() {
        let mut exam = ExamSession::new();
        exam.start(pool(1), 1);
        assert_eq!(exam.submit_answer(2), Err(AnswerError::OutOfRange { choices: 2 }));
        assert_eq!(exam.current_number(), 1);
        assert!(exam.is_in_progress());
    }

    #[test]
    fn answer_without_exam_is_rejected() {
        let mut exam = ExamSession::new();
        assert_eq!(exam.submit_answer(0), Err(AnswerError::NotInProgress));
    }

    #[test]
    fn end_stops_early() {
        let mut exam = ExamSession::new();
        exam.start(pool(3), 3);
        exam.submit_answer(0).unwrap();
        assert!(exam.end());
        assert!(!exam.end());
        assert!((exam.score() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_pool_scores_zero() {
        let mut exam = ExamSession::new();
        exam.start(Vec::new(), 5);
        assert!(!exam.is_in_progress());
        assert_eq!(exam.score(), 0.0);
    }
}
