//! Spinner fed by the pipeline's step notifications.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use stackgen_core::application::{GenerationObserver, Step};

/// Shows the running step next to a spinner.
pub struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    /// A spinner on stderr, or an inert one when `visible` is false.
    pub fn new(visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
            .template("{spinner:.cyan} {msg} {prefix:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    /// A clone of the underlying bar, so the caller can clear it when the
    /// run ends.
    pub fn handle(&self) -> ProgressBar {
        self.bar.clone()
    }
}

impl GenerationObserver for SpinnerObserver {
    fn step_started(&self, step: Step, subproject: &str) {
        self.bar.set_message(format!("{step}"));
        self.bar.set_prefix(format!("({subproject})"));
    }

    fn step_finished(&self, _step: Step, _subproject: &str) {
        self.bar.inc(1);
    }
}
