use indicatif::ProgressBar;
use std::time::Duration;

/// Spinner shown while batches stream into the store.
///
/// Hidden automatically when stdout is not a terminal.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let bar = if console::Term::stdout().is_term() {
            let bar = ProgressBar::new_spinner().with_message(message.to_string());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    pub fn finish(&self, message: String) {
        self.bar.finish_with_message(message);
    }
}
