use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use spool_engine::{Phase, ProgressEvent, ProgressSink};

const BAR_TEMPLATE: &str =
    "{spinner:.blue} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

/// Renders capture progress on the terminal.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new(hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

impl ProgressSink for ProgressReporter {
    fn on_progress(&self, event: ProgressEvent) {
        match event.phase {
            Phase::Resolving => self.bar.set_message("Resolving playlist..."),
            Phase::Downloading => {
                self.bar.set_length(event.total as u64);
                self.bar.set_position(event.completed as u64);
                if let Some(detail) = event.detail {
                    self.bar.set_message(detail);
                }
            }
            Phase::Assembling => {
                self.bar.set_length(event.total as u64);
                self.bar.set_position(event.completed as u64);
                self.bar.set_message("Assembling media...");
            }
            Phase::Done => self.bar.finish_with_message("Done"),
            Phase::Failed => self
                .bar
                .abandon_with_message(event.detail.unwrap_or_else(|| "Failed".to_string())),
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
