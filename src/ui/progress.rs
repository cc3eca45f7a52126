use crate::session::FlushReport;
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Spinner shown while a session ingests its event stream.
///
/// Hidden when stdout is not a terminal.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if console::Term::stdout().is_term() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}

/// One-line completion summary after a flush.
pub fn finish_with_summary(duration: Duration, report: &FlushReport) {
    println!();
    println!(
        "{} {}",
        Icons::CHECK.style(theme().success),
        format!("Session flushed in {}", HumanDuration(duration)).style(theme().success)
    );
    println!(
        "  {} {} events  {} {} entities  {} {} relations",
        Icons::FILE.style(theme().info),
        report.ingest.events(),
        Icons::PACKAGE.style(theme().info),
        report.pending.entities,
        Icons::LINK.style(theme().info),
        report.pending.relations
    );
}
