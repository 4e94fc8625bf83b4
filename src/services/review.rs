use crate::domain::{ImageInfo, Session};
use crate::error::ImageInfoError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Accept/reject state of one review over a flat image list.
///
/// Flags are keyed by image path, so they outlive rescans that hide or
/// reorder images; checkpoints see them keyed by flat index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSession {
    input_dir: PathBuf,
    images: Vec<String>,
    current_index: usize,
    rejected: BTreeMap<String, bool>,
}

impl ReviewSession {
    pub fn new(input_dir: PathBuf, images: Vec<String>) -> Self {
        Self {
            input_dir,
            images,
            current_index: 0,
            rejected: BTreeMap::new(),
        }
    }

    pub fn from_session(session: Session) -> Self {
        let count = session.images_path.len();
        let rejected = session
            .rejected_images
            .iter()
            .filter_map(|(index, flag)| session.images_path.get(*index).map(|path| (path.clone(), *flag)))
            .collect();

        Self {
            input_dir: session.input_dir,
            current_index: session.current_index.min(count.saturating_sub(1)),
            images: session.images_path,
            rejected,
        }
    }

    /// Restores a checkpoint on top of a fresh scan. When the image lists
    /// differ the scan wins and flags follow image paths.
    pub fn resume(session: Session, images: Vec<String>) -> Self {
        let mut review = Self::from_session(session);
        if review.images != images {
            log::warn!(
                "Checkpoint lists {} images, directory now has {}; rejection flags follow image paths",
                review.len(),
                images.len()
            );
            review.replace_images(images);
        }
        review
    }

    /// Checkpoint of the current list. Flags of images outside it are not
    /// written, since the checkpoint can only address listed images.
    pub fn to_session(&self) -> Session {
        let rejected = self
            .images
            .iter()
            .enumerate()
            .filter_map(|(index, path)| self.rejected.get(path).map(|flag| (index, *flag)))
            .collect();

        Session::new(
            self.input_dir.clone(),
            self.images.clone(),
            self.current_index,
            rejected,
        )
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_image(&self) -> Option<&str> {
        self.images.get(self.current_index).map(String::as_str)
    }

    pub fn current_info(&self) -> Option<Result<ImageInfo, ImageInfoError>> {
        self.current_image().map(ImageInfo::from_relative_path)
    }

    /// `"3/10"`, one-based.
    pub fn position_label(&self) -> String {
        if self.images.is_empty() {
            return "0/0".to_string();
        }
        format!("{}/{}", self.current_index + 1, self.images.len())
    }

    pub fn next_image(&mut self) -> usize {
        if !self.images.is_empty() {
            self.current_index = (self.current_index + 1) % self.images.len();
        }
        self.current_index
    }

    pub fn prev_image(&mut self) -> usize {
        if !self.images.is_empty() {
            let len = self.images.len();
            self.current_index = (self.current_index + len - 1) % len;
        }
        self.current_index
    }

    /// Moves to `target` when it is a valid position. Returns whether it moved.
    pub fn jump_to(&mut self, target: Option<usize>) -> bool {
        match target {
            Some(index) if index < self.images.len() => {
                self.current_index = index;
                true
            }
            _ => false,
        }
    }

    /// Flips the flag of the current image and returns the new state.
    pub fn toggle_rejection(&mut self) -> Option<bool> {
        let path = self.images.get(self.current_index)?.clone();
        let flag = self.rejected.entry(path).or_insert(false);
        *flag = !*flag;
        log::debug!("Rejection status for index {}: {}", self.current_index, flag);
        Some(*flag)
    }

    pub fn is_rejected(&self, index: usize) -> bool {
        self.images
            .get(index)
            .and_then(|path| self.rejected.get(path))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_current_rejected(&self) -> bool {
        self.is_rejected(self.current_index)
    }

    /// Rejected images in the current list.
    pub fn rejected_count(&self) -> usize {
        self.images
            .iter()
            .filter(|path| self.rejected.get(*path).copied().unwrap_or(false))
            .count()
    }

    /// Rejected images, including those hidden by the current filter.
    pub fn total_rejected_count(&self) -> usize {
        self.rejected.values().filter(|r| **r).count()
    }

    /// Rejected images the current list does not show.
    pub fn hidden_rejected_count(&self) -> usize {
        self.total_rejected_count().saturating_sub(self.rejected_count())
    }

    /// Swaps in the image list of a new scan. The current image keeps focus
    /// when it is still listed.
    pub fn replace_images(&mut self, images: Vec<String>) {
        let current_index = self
            .current_image()
            .and_then(|current| images.iter().position(|path| path == current))
            .unwrap_or(0);

        self.current_index = current_index;
        self.images = images;
    }
}
