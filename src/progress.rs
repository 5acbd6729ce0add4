//! Progress spinner for long generation calls.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

/// Label shown while waiting on a generation call.
pub const INFERENCING: &str = "inferencing";

/// Format one spinner line.
pub fn spinner_line(frame_index: usize, label: &str, elapsed: Duration) -> String {
    let frame = SPINNER_FRAMES[frame_index % SPINNER_FRAMES.len()];
    format!("\r{frame} {label}... {}s", elapsed.as_secs())
}

/// Single-line spinner redrawn in place on stdout.
#[derive(Debug)]
pub struct Spinner {
    label: String,
    started: Instant,
    frame: AtomicUsize,
}

impl Spinner {
    /// Start a spinner now.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
            frame: AtomicUsize::new(0),
        }
    }

    /// Line the next tick will draw, advancing the frame.
    pub fn next_line(&self) -> String {
        let idx = self.frame.fetch_add(1, Ordering::Relaxed);
        spinner_line(idx, &self.label, self.started.elapsed())
    }

    /// Redraw the spinner.
    pub fn tick(&self) {
        let line = self.next_line();
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(line.as_bytes());
        let _ = out.flush();
    }

    /// Move past the spinner line once something was drawn.
    pub fn finish(&self) {
        if self.frame.load(Ordering::Relaxed) > 0 {
            println!();
        }
    }
}
