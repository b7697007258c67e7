use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::debug;
use std::sync::Mutex;

use super::styling::{caution, done, heading, running};

/// Sink for warnings and progress, handed explicitly to every component.
///
/// The run is sequential, so at most one operation reports at a time.
pub trait Reporter: Send + Sync {
    /// A recoverable problem; the run continues in a degraded state.
    fn warn(&self, message: &str);

    /// A new pipeline stage begins.
    fn stage(&self, name: &str);

    /// Called after each item of a batched submission completes.
    fn progress(&self, completed: usize, total: usize, key: &str);

    /// The run is over; close any open progress display.
    fn finish(&self) {}
}

/// Drives spinners and progress bars on stderr and prints warnings between them.
pub struct ConsoleReporter {
    current: Mutex<Option<Active>>,
}

struct Active {
    pb: ProgressBar,
    label: String,
    counted: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        eprintln!("⚙️  {}", heading("Stages"));
        Self {
            current: Mutex::new(None),
        }
    }

    fn close(active: Active) {
        active
            .pb
            .finish_with_message(done(format!("{} ✓", active.label)).to_string());
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn warn(&self, message: &str) {
        debug!("warning: {message}");
        let line = warning_line(message);
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        match current.as_ref() {
            Some(active) => active.pb.suspend(|| eprintln!("{line}")),
            None => eprintln!("{line}"),
        }
    }

    fn stage(&self, name: &str) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(active) = current.take() {
            Self::close(active);
        }
        *current = Some(Active {
            pb: create_spinner(running(name).to_string()),
            label: name.to_string(),
            counted: false,
        });
    }

    fn progress(&self, completed: usize, total: usize, key: &str) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let active = current.get_or_insert_with(|| Active {
            pb: create_spinner(String::new()),
            label: "Generating".to_string(),
            counted: false,
        });

        if !active.counted {
            active.pb.set_length(total as u64);
            active.pb.set_style(bar_style());
            active.counted = true;
        }
        active.pb.set_position(completed as u64);
        active.pb.set_message(format!("{} {}", running(&active.label), key));
    }

    fn finish(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(active) = current.take() {
            Self::close(active);
        }
        eprintln!();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(spinner_style());
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("  {msg} {spinner}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Warnings are printed regardless of the log filter.
fn warning_line(message: &str) -> String {
    format!("  {} {message}", caution("⚠"))
}
