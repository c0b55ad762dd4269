//! Background progress reporting.
//!
//! Purely observational: a reporter thread reads the shared checked counter
//! once per second and redraws a single status line in place. Stopping the
//! reporter emits one final line consistent with the counter's last value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Format a duration as `HH:MM:SS` (hours saturate past a day).
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn progress_line(checked: u64, total: u64, elapsed: Duration, final_line: bool) -> String {
    let percent = if total > 0 {
        checked as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    let eta = if final_line || checked == 0 {
        Duration::ZERO
    } else {
        let left = total.saturating_sub(checked);
        Duration::from_secs_f64(elapsed.as_secs_f64() / checked as f64 * left as f64)
    };
    format!(
        "{checked}/{total} ({percent:.2}%) | elapsed {} | ETA {}",
        format_hms(elapsed),
        format_hms(eta)
    )
}

/// One-second-interval reporter over a shared checked counter.
#[derive(Debug)]
pub struct ProgressReporter {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Spawn the reporter thread. `total` is the size of the search space
    /// (saturated to u64 for display).
    pub fn start(total: u64, checked: Arc<AtomicU64>) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            let bar = ProgressBar::new(total);
            bar.set_style(ProgressStyle::with_template("{msg}").expect("static template"));
            let started = Instant::now();
            loop {
                let now = checked.load(Ordering::Relaxed);
                bar.set_message(progress_line(now, total, started.elapsed(), false));
                match stop_rx.recv_timeout(Duration::from_secs(1)) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            let now = checked.load(Ordering::Relaxed);
            bar.set_message(progress_line(now, total, started.elapsed(), true));
            bar.finish();
        });
        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Stop the reporter, waiting for its final line.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
