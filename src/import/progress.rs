//! Progress tracking for dump traversal

use super::source::TraverseStats;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Progress tracker for a traversal
pub struct TraverseProgress {
    /// Spinner (None if running in quiet mode)
    progress_bar: Option<ProgressBar>,
    start_time: Instant,
    pages_read: AtomicU64,
    errors: AtomicU64,
    coords_found: AtomicU64,
    coords_failed: AtomicU64,
    /// Log a progress line every N pages
    report_interval: u64,
    cancelled: AtomicBool,
}

impl TraverseProgress {
    /// Create a new progress tracker
    pub fn new(report_interval: u64, quiet: bool) -> Self {
        let progress_bar = if !quiet {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} pages {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        Self {
            progress_bar,
            start_time: Instant::now(),
            pages_read: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            coords_found: AtomicU64::new(0),
            coords_failed: AtomicU64::new(0),
            report_interval: report_interval.max(1),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Update progress after a page was read
    pub fn page_read(&self, title: &str) {
        let read = self.pages_read.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(ref pb) = self.progress_bar {
            pb.set_position(read);
        }

        if read % self.report_interval == 0 {
            let rate = self.rate(read);
            tracing::info!("Processed {} pages ({:.1} pages/s)", read, rate);
            if let Some(ref pb) = self.progress_bar {
                pb.set_message(format!(
                    "| {:.1} pages/s | {}",
                    rate,
                    short_title(title)
                ));
            }
        }
    }

    /// Record a page or segment error
    pub fn error(&self, error: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Reader error: {}", error);
    }

    /// Record the outcome of a coordinate lookup
    pub fn coords(&self, parsed: bool) {
        if parsed {
            self.coords_found.fetch_add(1, Ordering::Relaxed);
        } else {
            self.coords_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn rate(&self, pages: u64) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            pages as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TraverseStats {
        let mut stats = TraverseStats {
            pages_read: self.pages_read.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            coords_found: self.coords_found.load(Ordering::Relaxed),
            coords_failed: self.coords_failed.load(Ordering::Relaxed),
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
            pages_per_second: 0.0,
        };
        stats.update_rate();
        stats
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        if let Some(ref pb) = self.progress_bar {
            pb.abandon_with_message("Cancelled");
        }
    }

    /// Finish the spinner
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            let stats = self.get_stats();
            pb.finish_with_message(format!(
                "Done! {} errors, {:.1} pages/s",
                stats.errors, stats.pages_per_second
            ));
        }
    }

    /// Print summary to console
    pub fn print_summary(&self, with_coords: bool) {
        let stats = self.get_stats();

        println!("\nTraversal Summary");
        println!("=================");
        println!("Pages read:      {}", stats.pages_read);
        println!("Errors:          {}", stats.errors);
        if with_coords {
            println!("Coords found:    {}", stats.coords_found);
            println!("Coords failed:   {}", stats.coords_failed);
        }
        println!("Elapsed time:    {:.1}s", stats.elapsed_seconds);
        println!("Processing rate: {:.1} pages/s", stats.pages_per_second);
    }
}

/// Truncate a title for display, on a char boundary
fn short_title(title: &str) -> String {
    if title.chars().count() > 30 {
        let truncated: String = title.chars().take(27).collect();
        format!("{}...", truncated)
    } else {
        title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_tracking() {
        let progress = TraverseProgress::new(2, true);

        progress.page_read("Anarchism");
        progress.page_read("Autism");
        progress.page_read("Albedo");
        progress.error("segment at 617 ended early");
        progress.coords(true);
        progress.coords(false);
        progress.coords(false);

        let stats = progress.get_stats();
        assert_eq!(stats.pages_read, 3);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.coords_found, 1);
        assert_eq!(stats.coords_failed, 2);
    }

    #[test]
    fn test_short_title() {
        assert_eq!(short_title("Zrínyi Miklós"), "Zrínyi Miklós");
        let long = "Ł".repeat(40);
        assert_eq!(short_title(&long).chars().count(), 30);
    }

    #[test]
    fn test_cancellation() {
        let progress = TraverseProgress::new(100, true);

        assert!(!progress.is_cancelled());
        progress.cancel();
        assert!(progress.is_cancelled());
    }
}
