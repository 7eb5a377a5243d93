//! Renders [`xdvdfs_core::progress::ProgressEvent`]s to a terminal bar.
//!
//! The teacher crate reports progress through its own `ProgressVisitor`
//! trait straight to stdout, one line per file added; this CLI instead
//! adapts the core's sink trait onto a single `indicatif` bar, since a
//! trim/verify pass reports byte counts rather than discrete per-file
//! events.

use indicatif::{ProgressBar, ProgressStyle};
use xdvdfs_core::progress::{ProgressEvent, ProgressSink};

pub struct BarProgressReporter {
    bar: ProgressBar,
}

impl BarProgressReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .progress_chars("=>-");
        bar.set_style(style);
        Self { bar }
    }
}

impl Default for BarProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgressReporter {
    fn report(&mut self, event: ProgressEvent) {
        self.bar.set_length(event.total_bytes);
        self.bar.set_position(event.bytes_processed);
        self.bar.set_message(event.status_text);
    }
}

impl Drop for BarProgressReporter {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}
