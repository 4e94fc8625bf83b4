use crate::domain::{DirEntry, ScanResult};
use crate::error::TraversalError;
use anyhow::Result;
use std::path::Path;

/// Lists the immediate children of one directory.
pub trait TraversalPort {
    fn name(&self) -> &'static str;
    fn list_entries(&self, dir: &Path) -> Result<Vec<DirEntry>, TraversalError>;
}

pub trait OutputPort {
    fn write_results(&self, results: &ScanResult) -> Result<()>;
}

/// Receives scan progress. `subject_listed` may be called from several
/// threads at once.
pub trait ProgressPort {
    fn start(&self, subjects: u64);
    fn subject_listed(&self, subject: &str, images: usize);
    fn finish(&self, result: &ScanResult);
}

impl<T: TraversalPort + ?Sized> TraversalPort for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn list_entries(&self, dir: &Path) -> Result<Vec<DirEntry>, TraversalError> {
        (**self).list_entries(dir)
    }
}
