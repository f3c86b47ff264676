//! Progress bars and phase logging.
//!
//! Jobs report per-item progress through `JobProgress`. In log-only mode the
//! bars are hidden and periodic `[phase] n/total (pct%)` lines go to stderr
//! instead, which keeps output readable when redirected to a file.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Items between two log lines in log-only mode.
const LOG_INTERVAL: u64 = 100;

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Progress of one job phase over a known number of items.
pub struct JobProgress {
    phase: String,
    total: u64,
    current: u64,
    bar: ProgressBar,
}

impl JobProgress {
    pub fn new(phase: &str, total: usize) -> Self {
        let total = total as u64;
        let bar = ProgressBar::new(total);
        if is_log_only() {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(phase.to_string());
        Self {
            phase: phase.to_string(),
            total,
            current: 0,
            bar,
        }
    }

    pub fn inc(&mut self) {
        self.current += 1;
        self.bar.inc(1);
        if is_log_only() && (self.current % LOG_INTERVAL == 0 || self.current == self.total) {
            let pct = if self.total == 0 {
                100.0
            } else {
                100.0 * self.current as f64 / self.total as f64
            };
            eprintln!("[{}] {}/{} ({:.1}%)", self.phase, self.current, self.total, pct);
        }
    }

    pub fn finish(self, msg: &str) {
        if is_log_only() {
            eprintln!("[{}] {}", self.phase, msg);
        }
        self.bar.finish_with_message(format!("{}: {}", self.phase, msg));
    }
}

/// Spinner for steps without a known item count (network fetches, DDL).
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        if let Ok(style) = ProgressStyle::default_spinner().template("{msg} {spinner} [{elapsed_precise}]") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}
