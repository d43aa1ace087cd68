//! Progress indicators for CLI operations
//!
//! Renders import session events as a spinner plus colored status lines.

use crate::import::{ImportEvent, Notice, Severity};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Colored one-line rendering of a notice
pub fn format_notice(notice: &Notice) -> String {
    match notice.severity {
        Severity::Info => format!("{} {}", "ℹ".cyan(), notice.message),
        Severity::Success => format!("{} {}", "✓".green(), notice.message),
        Severity::Warning => format!("{} {}", "⚠".yellow(), notice.message.yellow()),
        Severity::Error => format!("{} {}", "✗".red(), notice.message.red()),
    }
}

/// Turns the event stream of an import into terminal output
///
/// Info notices become the spinner message while a step runs; every other
/// notice is printed as its own line.
#[derive(Default)]
pub struct ImportReporter {
    spinner: Option<ProgressBar>,
}

impl ImportReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: ImportEvent) {
        match event {
            ImportEvent::Notice(notice) if notice.severity == Severity::Info => {
                self.spinner(&notice.message).set_message(notice.message);
            }
            ImportEvent::Notice(notice) => self.println(format_notice(&notice)),
            ImportEvent::PollRecorded {
                job_id,
                status,
                poll_count,
            } => {
                self.spinner("Checking status...")
                    .set_message(format!("Job {} {} (check {})", job_id, status, poll_count));
            }
            ImportEvent::ResultReady { .. } | ImportEvent::TimedOut { .. } | ImportEvent::Reset { .. } => {
                self.finish();
            }
            ImportEvent::FileSelected { .. }
            | ImportEvent::ObjectStored { .. }
            | ImportEvent::JobCreated { .. }
            | ImportEvent::Approved { .. } => {}
        }
    }

    /// Clear the spinner, if one is running.
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn spinner(&mut self, message: &str) -> &ProgressBar {
        self.spinner.get_or_insert_with(|| create_spinner(message))
    }

    fn println(&self, line: String) {
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }
}

impl Drop for ImportReporter {
    fn drop(&mut self) {
        self.finish();
    }
}
