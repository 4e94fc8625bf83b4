use crate::domain::{DirEntry, EntryKind, TraversalBackend};
use crate::error::TraversalError;
use crate::ports::TraversalPort;
use ignore::WalkBuilder;
use std::fs::{self, FileType};
use std::io;
use std::path::Path;

/// Symlinks to files count as files; symlinks to directories are never
/// descended.
fn classify(path: &Path, file_type: Option<FileType>) -> EntryKind {
    match file_type {
        Some(ft) if ft.is_dir() => EntryKind::Directory,
        Some(ft) if ft.is_file() => EntryKind::File,
        Some(ft) if ft.is_symlink() => match fs::metadata(path) {
            Ok(meta) if meta.is_file() => EntryKind::File,
            _ => EntryKind::Other,
        },
        _ => EntryKind::Other,
    }
}

fn walk_error(dir: &Path, err: ignore::Error) -> TraversalError {
    let message = err.to_string();
    match err.into_io_error() {
        Some(io_err) => TraversalError::from_io(dir.to_path_buf(), io_err),
        None => TraversalError::Backend {
            path: dir.to_path_buf(),
            source: io::Error::other(message),
        },
    }
}

/// Directory listing through `ignore`'s walker, one level deep and with every
/// ignore rule switched off.
pub struct WalkTraversal;

impl WalkTraversal {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WalkTraversal {
    fn default() -> Self {
        Self::new()
    }
}

impl TraversalPort for WalkTraversal {
    fn name(&self) -> &'static str {
        "walk"
    }

    fn list_entries(&self, dir: &Path) -> Result<Vec<DirEntry>, TraversalError> {
        let mut builder = WalkBuilder::new(dir);
        builder
            .standard_filters(false)
            .follow_links(false)
            .max_depth(Some(1));

        let mut entries = Vec::new();
        for result in builder.build() {
            let entry = result.map_err(|e| walk_error(dir, e))?;
            if entry.depth() == 0 {
                continue;
            }
            let kind = classify(entry.path(), entry.file_type());
            entries.push(DirEntry::new(entry.into_path(), kind));
        }

        Ok(entries)
    }
}

/// Plain `read_dir` listing.
pub struct StdTraversal;

impl StdTraversal {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdTraversal {
    fn default() -> Self {
        Self::new()
    }
}

impl TraversalPort for StdTraversal {
    fn name(&self) -> &'static str {
        "std"
    }

    fn list_entries(&self, dir: &Path) -> Result<Vec<DirEntry>, TraversalError> {
        let read_dir = fs::read_dir(dir).map_err(|e| TraversalError::from_io(dir.to_path_buf(), e))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| TraversalError::from_io(dir.to_path_buf(), e))?;
            let path = entry.path();
            let kind = classify(&path, entry.file_type().ok());
            entries.push(DirEntry::new(path, kind));
        }

        Ok(entries)
    }
}

pub fn traversal_for(backend: TraversalBackend) -> Box<dyn TraversalPort + Send + Sync> {
    match backend {
        TraversalBackend::Walk => Box::new(WalkTraversal::new()),
        TraversalBackend::Std => Box::new(StdTraversal::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn sorted_listing(traversal: &dyn TraversalPort, dir: &Path) -> Vec<(String, EntryKind)> {
        let mut listing: Vec<_> = traversal
            .list_entries(dir)
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.kind))
            .collect();
        listing.sort_by(|a, b| a.0.cmp(&b.0));
        listing
    }

    #[test]
    fn backends_list_the_same_entries() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("A.gif")).unwrap();
        File::create(temp.path().join(".hidden.png")).unwrap();
        fs::write(temp.path().join(".gitignore"), "*.gif\n").unwrap();
        fs::create_dir_all(temp.path().join("png/A")).unwrap();
        File::create(temp.path().join("png/A/a_1.png")).unwrap();

        let walk = sorted_listing(&WalkTraversal::new(), temp.path());
        let plain = sorted_listing(&StdTraversal::new(), temp.path());

        assert_eq!(walk, plain);
        assert_eq!(
            walk,
            vec![
                (".gitignore".to_string(), EntryKind::File),
                (".hidden.png".to_string(), EntryKind::File),
                ("A.gif".to_string(), EntryKind::File),
                ("png".to_string(), EntryKind::Directory),
            ]
        );
    }

    #[test]
    fn missing_directory_is_a_backend_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");

        assert!(matches!(
            StdTraversal::new().list_entries(&missing),
            Err(TraversalError::Backend { .. })
        ));
        assert!(WalkTraversal::new().list_entries(&missing).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_descended() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("real")).unwrap();
        File::create(temp.path().join("real/x_1.png")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("real/x_1.png"), temp.path().join("link.png"))
            .unwrap();

        for traversal in [traversal_for(TraversalBackend::Walk), traversal_for(TraversalBackend::Std)] {
            let listing = sorted_listing(traversal.as_ref(), temp.path());
            assert_eq!(
                listing,
                vec![
                    ("link.png".to_string(), EntryKind::File),
                    ("loop".to_string(), EntryKind::Other),
                    ("real".to_string(), EntryKind::Directory),
                ]
            );
        }
    }
}
