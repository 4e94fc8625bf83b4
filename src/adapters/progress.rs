use crate::domain::ScanResult;
use crate::ports::ProgressPort;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Per-subject scan progress. The message names the subject listed last and
/// the running image count.
pub struct ProgressBarAdapter {
    bar: ProgressBar,
    subjects: AtomicU64,
    images: AtomicU64,
}

impl ProgressBarAdapter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner} {bar:30.green/white} {pos}/{len} subjects  {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        Self::with_bar(bar)
    }

    pub fn new_quiet() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    pub fn with_quiet(self, quiet: bool) -> Self {
        if quiet { Self::new_quiet() } else { self }
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            subjects: AtomicU64::new(0),
            images: AtomicU64::new(0),
        }
    }

    /// Subjects listed since the last `start`.
    pub fn subjects_listed(&self) -> u64 {
        self.subjects.load(Ordering::Relaxed)
    }

    /// Images found since the last `start`.
    pub fn images_found(&self) -> u64 {
        self.images.load(Ordering::Relaxed)
    }
}

impl Default for ProgressBarAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressPort for ProgressBarAdapter {
    fn start(&self, subjects: u64) {
        self.subjects.store(0, Ordering::Relaxed);
        self.images.store(0, Ordering::Relaxed);
        self.bar.reset();
        self.bar.set_length(subjects);
        self.bar.set_message("listing png/");
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn subject_listed(&self, subject: &str, images: usize) {
        let done = self.subjects.fetch_add(1, Ordering::Relaxed) + 1;
        let found = self.images.fetch_add(images as u64, Ordering::Relaxed) + images as u64;
        self.bar.set_position(done);
        self.bar.set_message(format!("{} ({} images so far)", subject, found));
    }

    fn finish(&self, result: &ScanResult) {
        self.bar.disable_steady_tick();
        self.bar.finish_with_message(format!(
            "indexed {} images across {} subjects",
            result.total_images(),
            result.total_subjects()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_subjects_and_images_between_scans() {
        let progress = ProgressBarAdapter::new_quiet();
        progress.start(2);
        progress.subject_listed("sub-01", 3);
        progress.subject_listed("sub-02", 0);
        assert_eq!(progress.subjects_listed(), 2);
        assert_eq!(progress.images_found(), 3);

        progress.start(1);
        assert_eq!(progress.subjects_listed(), 0);
        assert_eq!(progress.images_found(), 0);
    }
}
