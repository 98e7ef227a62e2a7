//! # Question Bank
//!
//! Owns the in-memory question cache and decides where questions come from.
//!
//! ```text
//!              get_all()                         refresh(n)
//!                 │                                  │
//!        Populated? ── yes ──► clone          ceil(n / batch) batches
//!                 │ no                               │
//!         one batch of `batch_size`          generate ─► parse ─► accumulate
//!                 │                                  │  (stop on empty/failed)
//!       non-empty? ── yes ──► cache + return         │
//!                 │ no / error               non-empty? ── yes ──► replace cache
//!           static fallback (not cached)             │ no
//!                                                 keep cache, warn
//! ```
//!
//! Generation errors never reach the caller: they are logged and treated as
//! an empty batch.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::fallback::FallbackProvider;
use crate::generator::Generator;
use crate::output_parser::{questions_from_response, ParsedBatch};
use crate::prompt::QuestionPrompt;
use crate::question::Question;

/// Number of questions requested per generation call.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Pause between consecutive refresh batches.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);

/// Contents of the question cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CacheState {
    #[default]
    Empty,
    Populated(Vec<Question>),
}

/// Where the questions returned by [`QuestionBank::serve`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionSource {
    Cache,
    Generated,
    Fallback,
}

/// Questions handed to the caller together with their origin.
#[derive(Debug, Clone)]
pub struct Served {
    pub questions: Vec<Question>,
    pub source: QuestionSource,
}

/// What a [`QuestionBank::refresh`] call achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub requested: usize,
    pub delivered: usize,
    pub batches_planned: usize,
    pub batches_issued: usize,
    /// Whether the cache now holds the delivered questions.
    pub replaced: bool,
}

impl RefreshOutcome {
    /// Fewer questions than requested, possibly none.
    pub fn is_short(&self) -> bool {
        self.delivered < self.requested
    }
}

/// Cache and refresh orchestration around a [`Generator`].
///
/// Operations take `&mut self` and are meant to be called one at a time.
pub struct QuestionBank {
    generator: Arc<dyn Generator>,
    fallback: Arc<dyn FallbackProvider>,
    prompt: QuestionPrompt,
    batch_size: usize,
    batch_delay: Duration,
    cache: CacheState,
}

impl QuestionBank {
    pub fn new(generator: Arc<dyn Generator>, fallback: Arc<dyn FallbackProvider>) -> Self {
        Self {
            generator,
            fallback,
            prompt: QuestionPrompt::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
            cache: CacheState::Empty,
        }
    }

    pub fn with_prompt(mut self, prompt: QuestionPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    /// Values below 1 are treated as 1.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn cache(&self) -> &CacheState {
        &self.cache
    }

    pub fn cached_len(&self) -> usize {
        match &self.cache {
            CacheState::Empty => 0,
            CacheState::Populated(questions) => questions.len(),
        }
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    /// Questions for a new exam. Never fails and never returns an empty set
    /// unless the fallback provider is itself empty.
    pub async fn get_all(&mut self) -> Vec<Question> {
        self.serve().await.questions
    }

    /// Like [`get_all`](Self::get_all) but also reports where the questions came from.
    pub async fn serve(&mut self) -> Served {
        if let CacheState::Populated(questions) = &self.cache {
            debug!("returning {} cached questions", questions.len());
            return Served {
                questions: questions.clone(),
                source: QuestionSource::Cache,
            };
        }

        info!("no cached questions available, generating a batch");
        let questions = self.generate_batch(self.batch_size).await;
        if !questions.is_empty() {
            info!("generated {} questions", questions.len());
            self.cache = CacheState::Populated(questions.clone());
            return Served {
                questions,
                source: QuestionSource::Generated,
            };
        }

        info!("falling back to built-in questions");
        Served {
            questions: self.fallback.questions(),
            source: QuestionSource::Fallback,
        }
    }

    /// Replace the cache with `requested` freshly generated questions,
    /// fetched in sequential batches of at most `batch_size`.
    ///
    /// Stops at the first empty or failed batch. The cache is replaced only
    /// when at least one question was generated; otherwise it is left as it was.
    pub async fn refresh(&mut self, requested: usize) -> RefreshOutcome {
        let batches_planned = requested.div_ceil(self.batch_size);
        info!(
            "refreshing questions: {} requested in {} batches of up to {}",
            requested, batches_planned, self.batch_size
        );

        let mut accumulated: Vec<Question> = Vec::new();
        let mut batches_issued = 0;

        for batch in 0..batches_planned {
            if accumulated.len() >= requested {
                break;
            }
            if batch > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            let count = (requested - accumulated.len()).min(self.batch_size);
            info!("generating batch {} of {}: {} questions", batch + 1, batches_planned, count);
            batches_issued += 1;

            let questions = self.generate_batch(count).await;
            if questions.is_empty() {
                warn!("batch {} returned no questions, stopping", batch + 1);
                break;
            }
            accumulated.extend(questions);
            info!("batch {} complete, {} questions so far", batch + 1, accumulated.len());
        }

        let delivered = accumulated.len();
        let replaced = delivered > 0;
        if replaced {
            info!("refreshed cache with {} questions", delivered);
            self.cache = CacheState::Populated(accumulated);
        } else if requested > 0 {
            warn!("refresh produced no questions; keeping the existing cache");
        }

        RefreshOutcome {
            requested,
            delivered,
            batches_planned,
            batches_issued,
            replaced,
        }
    }

    /// Reset the cache to empty.
    pub fn clear(&mut self) {
        info!("clearing question cache");
        self.cache = CacheState::Empty;
    }

    /// One generation call for `count` questions, parsed tolerantly.
    /// Failures come back as an empty list.
    async fn generate_batch(&self, count: usize) -> Vec<Question> {
        let prompt = self.prompt.render(count, self.batch_size);
        debug!("generation prompt: {}", prompt);

        match self.generator.generate(&prompt).await {
            Ok(raw) => {
                let ParsedBatch { questions, report } = questions_from_response(&raw, count);
                debug!(?report, "parsed generated batch");
                questions
            }
            Err(e) => {
                warn!("question generation failed: {}", e);
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for QuestionBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionBank")
            .field("generator", &self.generator.describe())
            .field("batch_size", &self.batch_size)
            .field("batch_delay", &self.batch_delay)
            .field("cached", &self.cached_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply};
    use crate::fallback::StaticQuestions;
    use crate::generator::LlmGenerator;
    use crate::question::Choice;

    fn batch_json(prefix: &str, count: usize) -> String {
        let qs: Vec<Question> = (1..=count)
            .map(|i| {
                Question::new(
                    format!("{prefix} question {i}"),
                    vec![Choice::new("yes", true), Choice::new("no", false)],
                    "because",
                )
            })
            .collect();
        format!("```json\n{}\n```", serde_json::to_string_pretty(&qs).unwrap())
    }

    fn bank(script: Vec<MockReply>) -> (QuestionBank, Arc<MockBackend>) {
        let mock = Arc::new(MockBackend::scripted(script));
        let generator = LlmGenerator::builder("http://unused")
            .backend(mock.clone())
            .build()
            .unwrap();
        let bank = QuestionBank::new(Arc::new(generator), Arc::new(StaticQuestions))
            .with_batch_delay(Duration::ZERO);
        (bank, mock)
    }

    fn requested_counts(mock: &MockBackend) -> Vec<usize> {
        mock.prompts()
            .iter()
            .map(|p| {
                p.strip_prefix("Generate exactly ")
                    .and_then(|rest| rest.split_whitespace().next())
                    .and_then(|n| n.parse().ok())
                    .unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn refresh_splits_into_capped_batches() {
        let (mut bank, mock) = bank(vec![
            MockReply::text(batch_json("a", 5)),
            MockReply::text(batch_json("b", 5)),
            MockReply::text(batch_json("c", 3)),
        ]);

        let outcome = bank.refresh(13).await;

        assert_eq!(requested_counts(&mock), vec![5, 5, 3]);
        assert_eq!(outcome.batches_planned, 3);
        assert_eq!(outcome.batches_issued, 3);
        assert_eq!(outcome.delivered, 13);
        assert!(outcome.replaced);
        assert_eq!(bank.cached_len(), 13);
    }

    #[tokio::test]
    async fn refresh_stops_after_empty_batch() {
        let (mut bank, mock) = bank(vec![
            MockReply::text(batch_json("a", 5)),
            MockReply::text("I cannot help with that."),
            MockReply::text(batch_json("c", 3)),
        ]);

        let outcome = bank.refresh(13).await;

        assert_eq!(mock.call_count(), 2);
        assert_eq!(outcome.delivered, 5);
        assert!(outcome.is_short());
        assert_eq!(bank.cached_len(), 5);
    }

    #[tokio::test]
    async fn refresh_treats_generation_error_as_empty_batch() {
        let (mut bank, mock) = bank(vec![
            MockReply::text(batch_json("a", 5)),
            MockReply::status(500),
        ]);

        let outcome = bank.refresh(10).await;

        assert_eq!(mock.call_count(), 2);
        assert_eq!(outcome.delivered, 5);
        assert!(outcome.replaced);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_cache() {
        let (mut bank, _mock) = bank(vec![
            MockReply::text(batch_json("old", 2)),
            MockReply::fail("offline"),
        ]);
        bank.refresh(2).await;
        let before = bank.cache().clone();

        let outcome = bank.refresh(5).await;

        assert!(!outcome.replaced);
        assert_eq!(outcome.delivered, 0);
        assert_eq!(bank.cache(), &before);
    }

    #[tokio::test]
    async fn refresh_replaces_rather_than_merges() {
        let (mut bank, _mock) = bank(vec![
            MockReply::text(batch_json("old", 4)),
            MockReply::text(batch_json("new", 2)),
        ]);
        bank.refresh(4).await;
        bank.refresh(2).await;

        let questions = bank.get_all().await;
        assert_eq!(questions.len(), 2);
        assert!(questions.iter().all(|q| q.text.starts_with("new")));
    }

    #[tokio::test]
    async fn refresh_stops_once_enough_questions_arrived() {
        let (mut bank, mock) = bank(vec![MockReply::text(batch_json("a", 7))]);

        let outcome = bank.refresh(7).await;

        assert_eq!(mock.call_count(), 1);
        assert_eq!(outcome.batches_issued, 1);
        assert_eq!(outcome.delivered, 7);
    }

    #[tokio::test]
    async fn failed_get_serves_fallback_without_caching() {
        let (mut bank, mock) = bank(vec![MockReply::status(401)]);

        let first = bank.serve().await;
        assert_eq!(first.source, QuestionSource::Fallback);
        assert_eq!(first.questions, StaticQuestions.questions());
        assert_eq!(bank.cache(), &CacheState::Empty);

        let second = bank.get_all().await;
        assert_eq!(second, StaticQuestions.questions());
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn successful_get_is_cached() {
        let (mut bank, mock) = bank(vec![MockReply::text(batch_json("a", 5))]);

        assert_eq!(bank.serve().await.source, QuestionSource::Generated);
        assert_eq!(bank.serve().await.source, QuestionSource::Cache);
        assert_eq!(mock.call_count(), 1);
        assert_eq!(requested_counts(&mock), vec![5]);
    }

    #[tokio::test]
    async fn clear_forces_regeneration() {
        let (mut bank, mock) = bank(vec![MockReply::text(batch_json("a", 5))]);

        bank.get_all().await;
        bank.clear();
        bank.clear();
        bank.get_all().await;

        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn returned_questions_are_a_copy() {
        let (mut bank, _mock) = bank(vec![MockReply::text(batch_json("a", 3))]);

        let mut questions = bank.get_all().await;
        questions.clear();

        assert_eq!(bank.get_all().await.len(), 3);
    }

    #[tokio::test]
    async fn zero_refresh_issues_no_calls() {
        let (mut bank, mock) = bank(vec![MockReply::text(batch_json("a", 1))]);
        let outcome = bank.refresh(0).await;
        assert_eq!(outcome.batches_planned, 0);
        assert_eq!(mock.call_count(), 0);
        assert!(!outcome.replaced);
    }
}
