//! Spinner shown while the question bank waits on the model.

use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const TICK: Duration = Duration::from_millis(100);

/// Draws a spinner on stderr, or nothing when hidden.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    visible: bool,
}

impl Progress {
    pub fn new(visible: bool) -> Self {
        Self { visible }
    }

    pub fn hidden() -> Self {
        Self::new(false)
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .tick_strings(&["|", "/", "-", "\\", ""])
            .template("{msg} {spinner:.green}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    /// Await `task` while the spinner ticks on its own thread, then clear it.
    pub async fn run<F, T>(&self, message: impl Into<String>, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let bar = if self.visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
        };
        bar.set_style(Self::style());
        bar.set_message(message.into());
        bar.enable_steady_tick(TICK);

        let output = task.await;

        bar.finish_and_clear();
        output
    }
}
