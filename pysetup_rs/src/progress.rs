//! Status lines and spinners for terminal feedback.
//!
//! Everything here goes to the terminal for people; machine-readable output
//! (`--json`) is printed by the CLI directly.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Apply a braille spinner style with `template`, keeping indicatif's default
/// style if the template does not parse.
fn ticking(bar: &ProgressBar, template: &str, message: &str) {
    if let Ok(spinner_style) = ProgressStyle::default_spinner()
        .tick_strings(TICKS)
        .template(template)
    {
        bar.set_style(spinner_style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
}

/// Spinner shown while a subprocess runs.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        ticking(&bar, "{spinner:.cyan} {msg}", message);
        Self { bar }
    }

    pub fn finish_success(&self, message: &str) {
        self.bar.finish_and_clear();
        success(message);
    }

    pub fn finish_error(&self, message: &str) {
        self.bar.finish_and_clear();
        error(message);
    }
}

/// Spinner with a running `[done/total]` counter, for fan-out work whose size
/// is known once it starts: `⠹ Checking numpy [3/12]`.
pub struct CountingSpinner {
    bar: ProgressBar,
    verb: String,
}

impl CountingSpinner {
    pub fn new(verb: &str) -> Self {
        let bar = ProgressBar::new(0);
        ticking(&bar, "{spinner:.cyan} {msg} [{pos}/{len}]", verb);
        Self {
            bar,
            verb: verb.to_string(),
        }
    }

    pub fn set_total(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    /// Count one finished item and name it in the message.
    pub fn advance(&self, item: &str) {
        self.bar.inc(1);
        self.bar.set_message(format!("{} {}", self.verb, item));
    }

    pub fn done(&self) -> usize {
        self.bar.position() as usize
    }

    pub fn total(&self) -> usize {
        self.bar.length().unwrap_or(0) as usize
    }

    /// Clear the bar and print a summary, as a warning if items are missing.
    pub fn finish(&self, message: &str) {
        let short = self.done() < self.total();
        self.bar.finish_and_clear();
        if short {
            warning(message);
        } else {
            success(message);
        }
    }
}

pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

pub fn info(message: &str) {
    println!("{} {}", style("ℹ").blue().bold(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", style("⚠").yellow().bold(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Human-readable elapsed time: `420ms`, `3.25s`, `1.5m`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
