use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// A stderr spinner shown while a long-running step is in progress.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: impl Into<String>) -> Self {
        let pb = ProgressBar::new_spinner().with_message(message.into());
        match ProgressStyle::with_template("{spinner:.green} {msg}") {
            Ok(style) => pb.set_style(style),
            Err(e) => warn!("Falling back to the default spinner style: {}", e),
        }
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        Self { pb }
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.pb.disable_steady_tick();
        self.pb.finish_with_message(message.into());
    }

    pub fn is_finished(&self) -> bool {
        self.pb.is_finished()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}
