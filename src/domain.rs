use crate::error::ImageInfoError;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraversalBackend {
    #[default]
    Walk,
    Std,
}

impl TraversalBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraversalBackend::Walk => "walk",
            TraversalBackend::Std => "std",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// One classified entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(path: PathBuf, kind: EntryKind) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name, kind }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Case-insensitive extension check on the entry name.
    pub fn has_extension(&self, ext: &str) -> bool {
        self.name
            .rsplit_once('.')
            .is_some_and(|(_, e)| e.eq_ignore_ascii_case(ext))
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub root: PathBuf,
    pub subject_filter: Option<String>,
    pub backend: TraversalBackend,
    pub use_fallback: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            subject_filter: None,
            backend: TraversalBackend::Walk,
            use_fallback: true,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: PathBuf) -> Self {
        self.root = root;
        self
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.subject_filter = filter.filter(|f| !f.is_empty());
        self
    }

    pub fn with_backend(mut self, backend: TraversalBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_fallback(mut self, use_fallback: bool) -> Self {
        self.use_fallback = use_fallback;
        self
    }
}

/// Subject filter compiled from free text: a regex when it compiles,
/// otherwise a case-insensitive substring.
#[derive(Debug, Clone)]
pub enum SubjectFilter {
    Regex(Regex),
    Substring(String),
}

impl SubjectFilter {
    /// Returns `None` for an empty pattern.
    pub fn parse(pattern: &str) -> Option<Self> {
        if pattern.is_empty() {
            return None;
        }

        match Regex::new(pattern) {
            Ok(re) => {
                log::debug!("Using regex filter: {}", pattern);
                Some(SubjectFilter::Regex(re))
            }
            Err(_) => {
                log::warn!("Invalid regex pattern: {}. Using plain text matching.", pattern);
                Some(SubjectFilter::Substring(pattern.to_lowercase()))
            }
        }
    }

    pub fn matches(&self, subject: &str) -> bool {
        match self {
            SubjectFilter::Regex(re) => re.is_match(subject),
            SubjectFilter::Substring(needle) => subject.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// Snapshot produced by one full scan. Positions into `image_list` are only
/// meaningful for the scan that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub subject_list: Vec<String>,
    pub subject_indices: BTreeMap<String, usize>,
    pub subject_map: BTreeMap<String, Vec<String>>,
    pub subject_gifs: BTreeMap<String, String>,
    pub image_list: Vec<String>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a subject after all previously pushed ones. Subjects must be
    /// pushed in navigation order.
    pub fn push_subject(&mut self, subject: String, images: Vec<String>) {
        self.subject_indices.insert(subject.clone(), self.image_list.len());
        self.image_list.extend(images.iter().cloned());
        self.subject_map.insert(subject.clone(), images);
        self.subject_list.push(subject);
    }

    pub fn total_images(&self) -> usize {
        self.image_list.len()
    }

    pub fn total_subjects(&self) -> usize {
        self.subject_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_list.is_empty()
    }

    pub fn subject_start(&self, subject: &str) -> Option<usize> {
        self.subject_indices.get(subject).copied()
    }

    pub fn images_for(&self, subject: &str) -> &[String] {
        self.subject_map.get(subject).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Fields encoded in a relative image path of the form
/// `.../<subject>/<image_name>_<repetition>.png`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub subject: String,
    pub image_name: String,
    pub repetition: String,
}

impl ImageInfo {
    pub fn from_relative_path(path: &str) -> Result<Self, ImageInfoError> {
        let mut parts = path.rsplit(['/', '\\']);
        let file_name = parts.next().unwrap_or_default();
        let subject = match parts.next() {
            Some(s) if !s.is_empty() => s,
            _ => return Err(ImageInfoError::MissingSubject(path.to_string())),
        };

        let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
        let (image_name, repetition) = stem
            .rsplit_once('_')
            .ok_or_else(|| ImageInfoError::MissingRepetition(path.to_string()))?;

        Ok(Self {
            subject: subject.to_string(),
            image_name: image_name.to_string(),
            repetition: repetition.to_string(),
        })
    }

    /// Companion animation, relative to the scan root.
    pub fn gif_path(&self) -> String {
        format!("{}.gif", self.subject)
    }
}

fn now_timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}

/// Checkpoints written before anything was reviewed store `null` here.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Review state persisted in a checkpoint file. Rejection flags are keyed by
/// flat image index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default = "now_timestamp")]
    pub timestamp: String,
    pub input_dir: PathBuf,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_index: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rejected_images: BTreeMap<usize, bool>,
    pub images_path: Vec<String>,
}

impl Session {
    pub fn new(
        input_dir: PathBuf,
        images_path: Vec<String>,
        current_index: usize,
        rejected_images: BTreeMap<usize, bool>,
    ) -> Self {
        Self {
            timestamp: now_timestamp(),
            input_dir,
            current_index,
            rejected_images,
            images_path,
        }
    }

    pub fn is_rejected(&self, index: usize) -> bool {
        self.rejected_images.get(&index).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub subject: String,
    pub image_name: String,
    pub repetition: String,
    pub path: String,
    pub rejected_images: bool,
    pub input_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsDescription {
    pub timestamp: String,
    pub results: String,
    pub images_path: String,
}
