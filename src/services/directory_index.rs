use crate::domain::{DirEntry, ScanConfig, ScanResult, SubjectFilter};
use crate::error::TraversalError;
use crate::ports::{ProgressPort, TraversalPort};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const PNG_DIR: &str = "png";

/// Subject/image index over a QC root laid out as `<root>/<subject>.gif`
/// plus `<root>/png/<subject>/**/*.png`.
///
/// Every scan rebuilds the index from scratch; positions handed out by one
/// scan must not be used against the next.
pub struct DirectoryIndex<T, P> {
    traversal: T,
    fallback: Option<Box<dyn TraversalPort + Send + Sync>>,
    progress: P,
    result: ScanResult,
}

impl<T, P> DirectoryIndex<T, P>
where
    T: TraversalPort + Send + Sync,
    P: ProgressPort + Send + Sync,
{
    pub fn new(traversal: T, progress: P) -> Self {
        Self {
            traversal,
            fallback: None,
            progress,
            result: ScanResult::new(),
        }
    }

    /// Backend used for a directory when the primary one fails on it.
    pub fn with_fallback(mut self, fallback: Box<dyn TraversalPort + Send + Sync>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn scan(&mut self, config: &ScanConfig) -> &[String] {
        self.scan_directory(&config.root, config.subject_filter.as_deref())
    }

    pub fn scan_directory(&mut self, root: &Path, subject_filter: Option<&str>) -> &[String] {
        log::info!(
            "Scanning directory {} with filter: {:?}",
            root.display(),
            subject_filter
        );

        self.result = self.build(root, subject_filter);

        log::info!(
            "Total images found: {} across {} subjects",
            self.result.total_images(),
            self.result.total_subjects()
        );
        &self.result.image_list
    }

    fn build(&self, root: &Path, subject_filter: Option<&str>) -> ScanResult {
        let mut result = ScanResult::new();

        if !root.exists() {
            log::warn!("Directory does not exist: {}", root.display());
            return result;
        }

        let filter = subject_filter.and_then(SubjectFilter::parse);
        let gifs = self.collect_subject_gifs(root, filter.as_ref());
        log::info!("Found {} subjects after filtering", gifs.len());

        let png_root = root.join(PNG_DIR);
        if !png_root.is_dir() {
            log::warn!("PNG directory does not exist: {}", png_root.display());
            return result;
        }

        self.progress.start(gifs.len() as u64);

        let subjects: Vec<&String> = gifs.keys().collect();
        let listed: Vec<Vec<String>> = subjects
            .par_iter()
            .map(|subject| {
                let subject_dir = png_root.join(subject.as_str());
                let images = if subject_dir.is_dir() {
                    self.collect_pngs(root, &subject_dir)
                } else {
                    log::warn!("Subject directory not found: {}", subject_dir.display());
                    Vec::new()
                };

                self.progress.subject_listed(subject.as_str(), images.len());
                images
            })
            .collect();

        for (subject, images) in subjects.into_iter().zip(listed) {
            log::debug!("Subject {}: {} images", subject, images.len());
            result.push_subject(subject.clone(), images);
        }
        result.subject_gifs = gifs;
        self.progress.finish(&result);

        result
    }

    /// Subject id → GIF file name, for every GIF directly under `root` whose
    /// subject passes the filter.
    fn collect_subject_gifs(
        &self,
        root: &Path,
        filter: Option<&SubjectFilter>,
    ) -> BTreeMap<String, String> {
        let mut subjects = BTreeMap::new();

        for entry in self.list_dir(root) {
            if !entry.is_file() || !entry.has_extension("gif") {
                continue;
            }

            let subject = subject_id(&entry.name).to_string();

            if filter.is_some_and(|f| !f.matches(&subject)) {
                continue;
            }

            // Same subject from two GIFs: the later listing entry wins.
            subjects.insert(subject, entry.name);
        }

        subjects
    }

    /// Every `.png` below `dir`, as naturally sorted root-relative paths.
    fn collect_pngs(&self, root: &Path, dir: &Path) -> Vec<String> {
        let mut images = Vec::new();
        let mut pending: Vec<PathBuf> = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            for entry in self.list_dir(&current) {
                if entry.is_dir() {
                    pending.push(entry.path);
                } else if entry.is_file() && entry.has_extension("png") {
                    if let Some(relative) = relative_path(root, &entry.path) {
                        images.push(relative);
                    }
                }
            }
        }

        images.sort_by(|a, b| natord::compare(a, b));
        images
    }

    fn list_dir(&self, dir: &Path) -> Vec<DirEntry> {
        match self.traversal.list_entries(dir) {
            Ok(entries) => entries,
            Err(TraversalError::PermissionDenied(path)) => {
                log::warn!("Permission denied accessing directory: {}", path.display());
                Vec::new()
            }
            Err(err) => match &self.fallback {
                Some(fallback) => {
                    log::warn!(
                        "{} traversal failed ({}), falling back to {}",
                        self.traversal.name(),
                        err,
                        fallback.name()
                    );
                    fallback.list_entries(dir).unwrap_or_else(|e| {
                        log::warn!("Error accessing directory {}: {}", dir.display(), e);
                        Vec::new()
                    })
                }
                None => {
                    log::warn!("Error accessing directory {}: {}", dir.display(), err);
                    Vec::new()
                }
            },
        }
    }

    pub fn result(&self) -> &ScanResult {
        &self.result
    }

    pub fn image_list(&self) -> &[String] {
        &self.result.image_list
    }

    pub fn subject_list(&self) -> &[String] {
        &self.result.subject_list
    }

    pub fn subject_start(&self, subject: &str) -> Option<usize> {
        self.result.subject_start(subject)
    }

    pub fn images_for_subject(&self, subject: &str) -> &[String] {
        self.result.images_for(subject)
    }

    pub fn gif_for_subject(&self, subject: &str) -> Option<&str> {
        self.result.subject_gifs.get(subject).map(String::as_str)
    }

    /// Position in `subject_list` of the subject owning `position`.
    fn subject_slot(&self, position: usize) -> Option<usize> {
        let result = &self.result;
        if result.subject_list.is_empty() || position >= result.image_list.len() {
            return None;
        }

        // Empty subjects share their start with the next subject, so the last
        // start <= position always belongs to a subject that has images.
        let after = result
            .subject_list
            .partition_point(|s| result.subject_start(s).is_some_and(|start| start <= position));
        after.checked_sub(1)
    }

    pub fn subject_at_index(&self, position: usize) -> Option<&str> {
        self.subject_slot(position)
            .map(|slot| self.result.subject_list[slot].as_str())
    }

    /// Start of the first subject with images after the one owning `position`.
    pub fn next_subject_index(&self, position: usize) -> Option<usize> {
        let slot = self.subject_slot(position)?;
        self.result.subject_list[slot + 1..]
            .iter()
            .find(|s| !self.result.images_for(s).is_empty())
            .and_then(|s| self.result.subject_start(s))
    }

    /// Start of the last subject with images before the one owning `position`.
    pub fn prev_subject_index(&self, position: usize) -> Option<usize> {
        let slot = self.subject_slot(position)?;
        self.result.subject_list[..slot]
            .iter()
            .rev()
            .find(|s| !self.result.images_for(s).is_empty())
            .and_then(|s| self.result.subject_start(s))
    }

    /// Images of the matching subjects, derived from the last scan without
    /// touching the filesystem. Leaves the index itself untouched.
    pub fn filter_subjects(&self, pattern: &str) -> Vec<String> {
        let Some(filter) = SubjectFilter::parse(pattern) else {
            return self.result.image_list.clone();
        };

        self.result
            .subject_list
            .iter()
            .filter(|s| filter.matches(s))
            .flat_map(|s| self.result.images_for(s).iter().cloned())
            .collect()
    }
}

/// GIF name without its extension. A bare `.gif` keeps its whole name.
fn subject_id(gif_name: &str) -> &str {
    match gif_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => gif_name,
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ProgressBarAdapter, StdTraversal, WalkTraversal};
    use std::fs::{self, File};
    use std::io;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap();
    }

    fn fixture(files: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for file in files {
            touch(temp.path(), file);
        }
        temp
    }

    fn std_index() -> DirectoryIndex<StdTraversal, ProgressBarAdapter> {
        DirectoryIndex::new(StdTraversal::new(), ProgressBarAdapter::new_quiet())
    }

    fn two_subjects() -> TempDir {
        fixture(&["A.gif", "B.gif", "png/A/a_1.png", "png/A/a_2.png", "png/B/b_1.png"])
    }

    #[test]
    fn scan_builds_subject_index() {
        let temp = two_subjects();
        let mut index = std_index();

        let images = index.scan_directory(temp.path(), None).to_vec();

        assert_eq!(images, vec!["png/A/a_1.png", "png/A/a_2.png", "png/B/b_1.png"]);
        assert_eq!(index.subject_list(), ["A", "B"]);
        assert_eq!(index.subject_start("A"), Some(0));
        assert_eq!(index.subject_start("B"), Some(2));
        assert_eq!(index.gif_for_subject("B"), Some("B.gif"));

        assert_eq!(index.subject_at_index(2), Some("B"));
        assert_eq!(index.next_subject_index(0), Some(2));
        assert_eq!(index.prev_subject_index(2), Some(0));
        assert_eq!(index.next_subject_index(2), None);
        assert_eq!(index.prev_subject_index(1), None);
    }

    #[test]
    fn out_of_range_queries_return_none() {
        let temp = two_subjects();
        let mut index = std_index();
        assert_eq!(index.subject_at_index(0), None);

        index.scan_directory(temp.path(), None);
        assert_eq!(index.subject_at_index(3), None);
        assert_eq!(index.next_subject_index(3), None);
        assert_eq!(index.prev_subject_index(100), None);
    }

    #[test]
    fn pngs_are_naturally_sorted_at_any_depth() {
        let temp = fixture(&[
            "S.gif",
            "png/S/img_2.png",
            "png/S/img_10.png",
            "png/S/img_1.png",
            "png/S/deep/er/z_1.PNG",
            "png/S/notes.txt",
        ]);
        let mut index = std_index();

        let images = index.scan_directory(temp.path(), None).to_vec();

        assert_eq!(
            images,
            vec![
                "png/S/deep/er/z_1.PNG",
                "png/S/img_1.png",
                "png/S/img_2.png",
                "png/S/img_10.png",
            ]
        );
    }

    #[test]
    fn gif_extension_is_case_insensitive() {
        let temp = fixture(&["A.GIF", "B.gif", "C.png", "png/A/a_1.png", "png/B/b_1.png"]);
        let mut index = std_index();

        index.scan_directory(temp.path(), None);

        assert_eq!(index.subject_list(), ["A", "B"]);
    }

    #[test]
    fn colliding_gifs_yield_one_subject() {
        let temp = fixture(&["A.gif", "A.GIF", "png/A/a_1.png"]);
        let mut index = std_index();

        index.scan_directory(temp.path(), None);

        assert_eq!(index.subject_list(), ["A"]);
        assert_eq!(index.image_list(), ["png/A/a_1.png"]);
        let gif = index.gif_for_subject("A").unwrap();
        assert!(gif == "A.gif" || gif == "A.GIF");
    }

    #[test]
    fn subject_id_strips_only_the_last_extension() {
        assert_eq!(subject_id("sub-01.gif"), "sub-01");
        assert_eq!(subject_id("sub.01.GIF"), "sub.01");
        assert_eq!(subject_id(".gif"), ".gif");

        let temp = fixture(&[".gif", "png/.gif/x_1.png"]);
        let mut index = std_index();
        index.scan_directory(temp.path(), None);
        assert_eq!(index.subject_list(), [".gif"]);
        assert_eq!(index.image_list(), ["png/.gif/x_1.png"]);
    }

    #[test]
    fn regex_filter_drops_subjects() {
        let temp = fixture(&["A001.gif", "B002.gif", "png/A001/x_1.png", "png/B002/y_1.png"]);
        let mut index = std_index();

        let images = index.scan_directory(temp.path(), Some("A.*")).to_vec();
        assert_eq!(images, vec!["png/A001/x_1.png"]);
        assert_eq!(index.subject_list(), ["A001"]);

        let images = index.scan_directory(temp.path(), Some("zzz")).to_vec();
        assert!(images.is_empty());
        assert!(index.subject_list().is_empty());
    }

    #[test]
    fn invalid_regex_filter_matches_substring() {
        let temp = fixture(&["a(1.gif", "b2.gif", "png/a(1/x_1.png", "png/b2/y_1.png"]);
        let mut index = std_index();

        let images = index.scan_directory(temp.path(), Some("A(")).to_vec();

        assert_eq!(images, vec!["png/a(1/x_1.png"]);
    }

    #[test]
    fn missing_root_or_png_dir_yields_empty_index() {
        let temp = two_subjects();
        let mut index = std_index();
        index.scan_directory(temp.path(), None);

        let images = index.scan_directory(&temp.path().join("missing"), None).to_vec();
        assert!(images.is_empty());
        assert!(index.subject_list().is_empty());

        let no_png = fixture(&["A.gif"]);
        assert!(index.scan_directory(no_png.path(), None).is_empty());
        assert!(index.subject_list().is_empty());
    }

    #[test]
    fn subject_without_png_dir_keeps_offsets_consistent() {
        let temp = fixture(&["A.gif", "E.gif", "Z.gif", "png/A/a_1.png", "png/A/a_2.png", "png/Z/z_1.png"]);
        let mut index = std_index();

        index.scan_directory(temp.path(), None);

        assert_eq!(index.subject_list(), ["A", "E", "Z"]);
        assert_eq!(index.subject_start("E"), Some(2));
        assert_eq!(index.subject_start("Z"), Some(2));
        assert!(index.images_for_subject("E").is_empty());
        assert_eq!(index.subject_at_index(2), Some("Z"));
        assert_eq!(index.next_subject_index(0), Some(2));
        assert_eq!(index.prev_subject_index(2), Some(0));
    }

    #[test]
    fn positions_partition_into_subject_runs() {
        let temp = fixture(&[
            "A.gif",
            "B.gif",
            "C.gif",
            "png/A/a_1.png",
            "png/B/b_1.png",
            "png/B/b_2.png",
            "png/B/b_3.png",
            "png/C/c_1.png",
            "png/C/c_2.png",
        ]);
        let mut index = std_index();
        index.scan_directory(temp.path(), None);

        let result = index.result();
        let expected_len: usize = result.subject_list.iter().map(|s| result.images_for(s).len()).sum();
        assert_eq!(result.total_images(), expected_len);

        let mut prefix = 0;
        for subject in &result.subject_list {
            assert_eq!(result.subject_start(subject), Some(prefix));
            let images = result.images_for(subject);
            for (offset, image) in images.iter().enumerate() {
                assert_eq!(index.subject_at_index(prefix + offset), Some(subject.as_str()));
                assert_eq!(&result.image_list[prefix + offset], image);
            }
            prefix += images.len();
        }

        for p in 0..result.total_images() {
            if let Some(q) = index.next_subject_index(p) {
                let own = index.subject_at_index(p).unwrap();
                assert_eq!(index.prev_subject_index(q), index.subject_start(own));
            }
        }
    }

    #[test]
    fn filter_subjects_does_not_touch_index() {
        let temp = fixture(&[
            "A001.gif",
            "B002.gif",
            "C(03).gif",
            "png/A001/x_1.png",
            "png/B002/y_1.png",
            "png/C(03)/z_1.png",
        ]);
        let mut index = std_index();
        index.scan_directory(temp.path(), None);
        let before = index.result().clone();

        assert_eq!(index.filter_subjects("B0"), vec!["png/B002/y_1.png"]);
        assert!(index.filter_subjects("b0").is_empty());
        assert!(index.filter_subjects("b0(").is_empty());
        assert_eq!(index.filter_subjects("c(0"), vec!["png/C(03)/z_1.png"]);
        assert_eq!(index.filter_subjects(""), before.image_list);
        assert!(index.filter_subjects("zzz").is_empty());
        assert_eq!(index.result(), &before);
    }

    #[test]
    fn rescanning_is_idempotent() {
        let temp = two_subjects();
        let mut index = DirectoryIndex::new(WalkTraversal::new(), ProgressBarAdapter::new_quiet());

        index.scan_directory(temp.path(), None);
        let first = index.result().clone();
        index.scan_directory(temp.path(), None);

        assert_eq!(index.result(), &first);
    }

    #[test]
    fn walk_and_std_backends_agree() {
        let temp = fixture(&[
            "A.gif",
            "B.gif",
            "png/A/x/a_10.png",
            "png/A/a_9.png",
            "png/B/.hidden_1.png",
        ]);
        fs::write(temp.path().join("png/.gitignore"), "*\n").unwrap();

        let mut walk = DirectoryIndex::new(WalkTraversal::new(), ProgressBarAdapter::new_quiet());
        let mut plain = std_index();
        walk.scan_directory(temp.path(), None);
        plain.scan_directory(temp.path(), None);

        assert_eq!(walk.result(), plain.result());
        assert_eq!(plain.image_list().len(), 3);
    }

    struct BrokenTraversal;

    impl TraversalPort for BrokenTraversal {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn list_entries(&self, dir: &Path) -> Result<Vec<DirEntry>, TraversalError> {
            Err(TraversalError::Backend {
                path: dir.to_path_buf(),
                source: io::Error::other("backend unavailable"),
            })
        }
    }

    struct DenyingTraversal {
        denied: PathBuf,
    }

    impl TraversalPort for DenyingTraversal {
        fn name(&self) -> &'static str {
            "denying"
        }

        fn list_entries(&self, dir: &Path) -> Result<Vec<DirEntry>, TraversalError> {
            if dir == self.denied {
                return Err(TraversalError::PermissionDenied(dir.to_path_buf()));
            }
            StdTraversal::new().list_entries(dir)
        }
    }

    #[test]
    fn broken_backend_uses_fallback() {
        let temp = two_subjects();
        let mut expected = std_index();
        expected.scan_directory(temp.path(), None);

        let mut index = DirectoryIndex::new(BrokenTraversal, ProgressBarAdapter::new_quiet())
            .with_fallback(Box::new(StdTraversal::new()));
        index.scan_directory(temp.path(), None);

        assert_eq!(index.result(), expected.result());
    }

    #[test]
    fn broken_backend_without_fallback_finds_nothing() {
        let temp = two_subjects();
        let mut index = DirectoryIndex::new(BrokenTraversal, ProgressBarAdapter::new_quiet());

        assert!(index.scan_directory(temp.path(), None).is_empty());
    }

    #[test]
    fn denied_directory_is_skipped() {
        let temp = fixture(&["A.gif", "png/A/a_1.png", "png/A/locked/a_2.png", "png/A/open/a_3.png"]);
        let denied = temp.path().join("png/A/locked");
        let mut index = DirectoryIndex::new(DenyingTraversal { denied }, ProgressBarAdapter::new_quiet());

        let images = index.scan_directory(temp.path(), None).to_vec();

        assert_eq!(images, vec!["png/A/a_1.png", "png/A/open/a_3.png"]);
    }

    #[derive(Default)]
    struct RecordingProgress {
        listed: std::sync::Mutex<Vec<(String, usize)>>,
        finished: std::sync::Mutex<Option<usize>>,
    }

    impl ProgressPort for RecordingProgress {
        fn start(&self, _subjects: u64) {}

        fn subject_listed(&self, subject: &str, images: usize) {
            self.listed.lock().unwrap().push((subject.to_string(), images));
        }

        fn finish(&self, result: &ScanResult) {
            *self.finished.lock().unwrap() = Some(result.total_images());
        }
    }

    #[test]
    fn progress_reports_each_subject() {
        let temp = fixture(&["A.gif", "B.gif", "C.gif", "png/A/a_1.png", "png/A/a_2.png", "png/B/b_1.png"]);
        let mut index = DirectoryIndex::new(StdTraversal::new(), RecordingProgress::default());
        index.scan_directory(temp.path(), None);

        let mut listed = index.progress.listed.lock().unwrap().clone();
        listed.sort();
        assert_eq!(
            listed,
            vec![("A".to_string(), 2), ("B".to_string(), 1), ("C".to_string(), 0)]
        );
        assert_eq!(*index.progress.finished.lock().unwrap(), Some(3));
    }
}
