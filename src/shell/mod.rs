//! # Interactive Shell
//!
//! A line-oriented REPL over the [`QuestionBank`] and an [`ExamSession`].
//! [`Shell::execute`] maps one [`Command`] to the text shown to the user;
//! [`Shell::run`] drives it from any async line source.

pub mod commands;
pub mod progress;

pub use commands::{Command, CommandError};
pub use progress::Progress;

use std::io::Write;

use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::bank::{QuestionBank, QuestionSource};
use crate::error::Result;
use crate::exam::{AnswerError, ExamSession};
use crate::logging::LogControl;

pub const PROMPT: &str = "popm-exam:>";

/// What the REPL should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Exit,
}

/// Defaults for commands given without a count.
#[derive(Debug, Clone, Copy)]
pub struct ShellDefaults {
    pub exam_questions: usize,
    pub refresh_count: usize,
}

impl Default for ShellDefaults {
    fn default() -> Self {
        Self {
            exam_questions: 5,
            refresh_count: 10,
        }
    }
}

pub struct Shell {
    bank: QuestionBank,
    exam: ExamSession,
    log: LogControl,
    progress: Progress,
    defaults: ShellDefaults,
}

impl Shell {
    pub fn new(bank: QuestionBank, log: LogControl) -> Self {
        Self {
            bank,
            exam: ExamSession::new(),
            log,
            progress: Progress::new(true),
            defaults: ShellDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: ShellDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn exam(&self) -> &ExamSession {
        &self.exam
    }

    /// Read commands from `input` until EOF or `exit`, writing replies to `out`.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        writeln!(
            out,
            "{}\nType 'exam-help' for commands, 'exit' to quit.\n",
            "POPM Exam Practice".bold()
        )?;

        let mut lines = input.lines();
        loop {
            write!(out, "{} ", PROMPT.yellow())?;
            out.flush()?;

            let Some(line) = lines.next_line().await? else {
                writeln!(out)?;
                break;
            };

            match Command::parse(&line) {
                Ok(None) => continue,
                Ok(Some(command)) => match self.execute(command).await {
                    Outcome::Continue(text) => writeln!(out, "{}\n", text)?,
                    Outcome::Exit => break,
                },
                Err(e) => writeln!(out, "{}\n", e.to_string().red())?,
            }
        }
        Ok(())
    }

    pub async fn execute(&mut self, command: Command) -> Outcome {
        debug!(?command, "executing shell command");
        let text = match command {
            Command::StartExam(n) => self.start_exam(n.unwrap_or(self.defaults.exam_questions)).await,
            Command::Answer(n) => self.answer(n),
            Command::CurrentQuestion => self.current_question(),
            Command::EndExam => self.end_exam(),
            Command::Refresh(n) => self.refresh(n.unwrap_or(self.defaults.refresh_count)).await,
            Command::ClearCache => {
                self.bank.clear();
                "Question cache cleared. Next request will generate new questions.".to_string()
            }
            Command::Debug(switch) => self.debug(switch),
            Command::DebugRequest(n) => self.debug_request(n.unwrap_or(1)).await,
            Command::Help => help_text(),
            Command::Exit => return Outcome::Exit,
        };
        Outcome::Continue(text)
    }

    async fn start_exam(&mut self, count: usize) -> String {
        if count == 0 {
            return "An exam needs at least one question.".to_string();
        }
        let served = self
            .progress
            .run("Preparing questions...", self.bank.serve())
            .await;
        let source = served.source;
        self.exam.start(served.questions, count);

        if self.exam.total_questions() == 0 {
            return "No questions are available.".to_string();
        }

        let mut text = format!(
            "Starting new POPM mock exam with {} questions.",
            self.exam.total_questions()
        );
        if source == QuestionSource::Fallback {
            text.push_str(" (Question generation is unavailable; using built-in questions.)");
        }
        text.push_str("\n\n");
        text.push_str(&self.current_question());
        text
    }

    fn answer(&mut self, number: usize) -> String {
        let Some(index) = number.checked_sub(1) else {
            return AnswerError::OutOfRange {
                choices: self.exam.current_question().map_or(0, |q| q.choices.len()),
            }
            .to_string();
        };

        let feedback = match self.exam.submit_answer(index) {
            Ok(feedback) => feedback,
            Err(e) => return e.to_string(),
        };

        let mut text = String::from(if feedback.correct { "Correct! " } else { "Incorrect. " });
        match &feedback.correct_choice {
            Some(choice) => text.push_str(&format!("The correct answer is: {}\n\n", choice.text)),
            None => text.push_str("This question has no answer marked correct.\n\n"),
        }
        if !feedback.explanation.is_empty() {
            text.push_str(&format!("Explanation: {}\n\n", feedback.explanation));
        }

        if feedback.finished {
            text.push_str("Exam completed!\n");
            text.push_str(&self.score_lines());
        } else {
            text.push_str(&self.current_question());
        }
        text
    }

    fn current_question(&self) -> String {
        let Some(question) = self.exam.current_question() else {
            return AnswerError::NotInProgress.to_string();
        };

        let mut text = format!(
            "Question {} of {}:\n\n{}\n\n",
            self.exam.current_number(),
            self.exam.total_questions(),
            question.text
        );
        for (i, choice) in question.choices.iter().enumerate() {
            text.push_str(&format!("{}) {}\n", i + 1, choice.text));
        }
        text.push_str("\nEnter 'answer [number]' to submit your answer.");
        text
    }

    fn end_exam(&mut self) -> String {
        if !self.exam.end() {
            return "No exam is currently in progress.".to_string();
        }
        format!("Exam ended.\n{}", self.score_lines())
    }

    fn score_lines(&self) -> String {
        format!(
            "Your score: {:.1}%\nCorrect answers: {} out of {}",
            self.exam.score(),
            self.exam.correct_answers(),
            self.exam.total_questions()
        )
    }

    async fn refresh(&mut self, count: usize) -> String {
        if self.exam.is_in_progress() {
            return "Cannot refresh questions while an exam is in progress. End the current exam first."
                .to_string();
        }
        if count == 0 {
            return "Nothing to refresh: ask for at least one question.".to_string();
        }

        let message = format!("Generating {} new questions (in batches)...", count);
        let outcome = self.progress.run(message, self.bank.refresh(count)).await;

        if !outcome.replaced {
            return format!(
                "Failed to generate new questions. {} previously cached questions are unchanged.",
                self.bank.cached_len()
            );
        }
        let mut text = format!("Successfully generated {} new questions.", outcome.delivered);
        if outcome.is_short() {
            text.push_str(&format!(
                " (Requested {}; generation stopped after {} of {} batches.)",
                outcome.requested, outcome.batches_issued, outcome.batches_planned
            ));
        }
        text
    }

    fn debug(&mut self, switch: Option<bool>) -> String {
        let Some(enable) = switch else {
            return format!(
                "Debug logging is {}. Generator: {}",
                if self.log.is_debug() { "on" } else { "off" },
                self.bank.generator().describe()
            );
        };
        match self.log.set_debug(enable) {
            Ok(()) => format!("Debug logging {}", if enable { "enabled" } else { "disabled" }),
            Err(e) => {
                warn!("could not change log level: {}", e);
                format!("Could not change debug logging: {}", e)
            }
        }
    }

    async fn debug_request(&mut self, count: usize) -> String {
        let was_debug = self.log.is_debug();
        if let Err(e) = self.log.set_debug(true) {
            warn!("could not enable debug logging: {}", e);
        }
        self.bank.clear();

        let outcome = self
            .progress
            .run("Making debug request...", self.bank.refresh(count.max(1)))
            .await;

        if let Err(e) = self.log.set_debug(was_debug) {
            warn!("could not restore log level: {}", e);
        }
        format!(
            "Debug request completed: {} of {} questions parsed in {} call(s). Check logs for details.",
            outcome.delivered, outcome.requested, outcome.batches_issued
        )
    }
}

fn help_text() -> String {
    [
        "POPM Exam Practice CLI Help",
        "",
        "Available commands:",
        "- start-exam [number]        : Start a new exam with [number] questions (default: 5)",
        "- answer [number]            : Submit your answer for the current question",
        "- current-question           : Display the current question again",
        "- end-exam                   : End the current exam and see your score",
        "- refresh-questions [count]  : Generate new AI-powered questions (default: 10, processed in batches)",
        "- clear-cache                : Forget generated questions",
        "- debug [on|off]             : Toggle debug logging for generation",
        "- debug-request [count]      : Make a logged generation request (default: 1)",
        "- exam-help                  : Display this help information",
        "",
        "To exit the application, type 'exit'",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply};
    use crate::fallback::StaticQuestions;
    use crate::generator::LlmGenerator;
    use crate::logging;
    use crate::question::{Choice, Question};
    use std::sync::Arc;
    use std::time::Duration;

    fn one_question_json() -> String {
        let q = Question::new(
            "Who prioritizes the Team Backlog?",
            vec![
                Choice::new("Scrum Master", false),
                Choice::new("Product Owner", true),
                Choice::new("RTE", false),
                Choice::new("Business Owner", false),
            ],
            "The PO owns the Team Backlog.",
        );
        serde_json::to_string(&vec![q]).unwrap()
    }

    fn shell(script: Vec<MockReply>) -> (Shell, Arc<MockBackend>) {
        let mock = Arc::new(MockBackend::scripted(script));
        let generator = LlmGenerator::builder("http://unused")
            .backend(mock.clone())
            .build()
            .unwrap();
        let bank = QuestionBank::new(Arc::new(generator), Arc::new(StaticQuestions))
            .with_batch_delay(Duration::ZERO);
        let shell = Shell::new(bank, logging::detached(0)).with_progress(Progress::hidden());
        (shell, mock)
    }

    fn text(outcome: Outcome) -> String {
        match outcome {
            Outcome::Continue(text) => text,
            Outcome::Exit => panic!("unexpected exit"),
        }
    }

    #[tokio::test]
    async fn exam_flow_with_generated_question() {
        let (mut shell, _mock) = shell(vec![MockReply::text(one_question_json())]);

        let start = text(shell.execute(Command::StartExam(None)).await);
        assert!(start.starts_with("Starting new POPM mock exam with 1 questions."));
        assert!(start.contains("Question 1 of 1:"));
        assert!(start.contains("2) Product Owner"));

        let answer = text(shell.execute(Command::Answer(2)).await);
        assert!(answer.starts_with("Correct! The correct answer is: Product Owner"));
        assert!(answer.contains("Explanation: The PO owns the Team Backlog."));
        assert!(answer.contains("Your score: 100.0%"));
        assert!(answer.contains("Correct answers: 1 out of 1"));
    }

    #[tokio::test]
    async fn start_exam_falls_back_when_generation_fails() {
        let (mut shell, _mock) = shell(vec![MockReply::status(503)]);
        let start = text(shell.execute(Command::StartExam(Some(3))).await);
        assert!(start.contains("using built-in questions"));
        assert_eq!(shell.exam().total_questions(), 3);
    }

    #[tokio::test]
    async fn invalid_answer_number_is_reported() {
        let (mut shell, _mock) = shell(vec![MockReply::text(one_question_json())]);
        shell.execute(Command::StartExam(Some(1))).await;

        let reply = text(shell.execute(Command::Answer(0)).await);
        assert_eq!(reply, "Invalid choice number. Please select a number between 1 and 4");
        let reply = text(shell.execute(Command::Answer(9)).await);
        assert!(reply.starts_with("Invalid choice number"));
        assert!(shell.exam().is_in_progress());
    }

    #[tokio::test]
    async fn refresh_refused_during_exam() {
        let (mut shell, mock) = shell(vec![MockReply::text(one_question_json())]);
        shell.execute(Command::StartExam(None)).await;

        let reply = text(shell.execute(Command::Refresh(Some(5))).await);
        assert!(reply.starts_with("Cannot refresh questions while an exam is in progress"));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn refresh_reports_delivery() {
        let (mut shell, _mock) = shell(vec![MockReply::text(one_question_json())]);
        let reply = text(shell.execute(Command::Refresh(Some(1))).await);
        assert_eq!(reply, "Successfully generated 1 new questions.");
        assert_eq!(shell.bank().cached_len(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_says_so() {
        let (mut shell, _mock) = shell(vec![MockReply::text("no json here")]);
        let reply = text(shell.execute(Command::Refresh(Some(3))).await);
        assert!(reply.starts_with("Failed to generate new questions."));
    }

    #[tokio::test]
    async fn end_exam_without_exam() {
        let (mut shell, _mock) = shell(vec![MockReply::text("[]")]);
        let reply = text(shell.execute(Command::EndExam).await);
        assert_eq!(reply, "No exam is currently in progress.");
    }

    #[tokio::test]
    async fn debug_request_restores_log_level() {
        let (mut shell, mock) = shell(vec![MockReply::text(one_question_json())]);
        let reply = text(shell.execute(Command::DebugRequest(None)).await);
        assert!(reply.starts_with("Debug request completed: 1 of 1"));
        assert!(!shell.log.is_debug());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn run_reads_until_exit() {
        let (mut shell, _mock) = shell(vec![MockReply::text("[]")]);
        let input: &[u8] = b"exam-help\nbogus\n\nexit\nexam-help\n";
        let mut out = Vec::new();

        shell.run(input, &mut out).await.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches("POPM Exam Practice CLI Help").count(), 1);
        assert!(out.contains("Unknown command 'bogus'"));
        assert!(out.contains(PROMPT));
    }
}
