//! # POPM Exam
//!
//! Interactive practice for the SAFe POPM certification exam, with question
//! banks generated by an LLM and a built-in set to fall back on.
//!
//! ## Core Concepts
//!
//! - **[`QuestionBank`]**: caches generated questions, refreshes them in
//!   fixed-size batches, and falls back to [`StaticQuestions`] when
//!   generation fails.
//! - **[`Generator`]**: the boundary to the model, `prompt -> raw text`.
//!   [`LlmGenerator`] implements it over an HTTP [`Backend`](backend::Backend).
//! - **[`output_parser`]**: turns raw model text into [`Question`]s,
//!   salvaging every well-formed object from a partly broken response.
//! - **[`ExamSession`]**: a linear exam over a shuffled subset.
//! - **[`shell`]**: the command REPL tying it together.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use popm_exam::backend::AnthropicBackend;
//! use popm_exam::{LlmGenerator, QuestionBank, StaticQuestions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let generator = LlmGenerator::builder("https://api.anthropic.com")
//!         .backend(Arc::new(AnthropicBackend::new("sk-ant-...")))
//!         .model("claude-3-5-haiku-latest")
//!         .build()?;
//!
//!     let mut bank = QuestionBank::new(Arc::new(generator), Arc::new(StaticQuestions));
//!     let outcome = bank.refresh(13).await;
//!     println!("{} of {} questions generated", outcome.delivered, outcome.requested);
//!
//!     for q in bank.get_all().await {
//!         println!("{}", q.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Parsing Without a Model
//!
//! ```
//! use popm_exam::output_parser::questions_from_response;
//!
//! let raw = "```json\n[{\"text\": \"What is a PI?\", \"choices\": [], \"explanation\": \"\"},]\n```";
//! let batch = questions_from_response(raw, 1);
//! assert_eq!(batch.questions[0].text, "What is a PI?");
//! ```

pub mod backend;
pub mod bank;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod exam;
pub mod fallback;
pub mod generator;
pub mod logging;
pub mod output_parser;
pub mod prompt;
pub mod question;
pub mod shell;

pub use bank::{CacheState, QuestionBank, QuestionSource, RefreshOutcome};
pub use diagnostics::{ParseReport, ParseStrategy};
pub use error::{ExamError, Result};
pub use exam::{AnswerFeedback, ExamSession};
pub use fallback::{FallbackProvider, StaticQuestions};
pub use generator::{Generator, LlmGenerator};
pub use question::{Choice, Question};
