use crate::domain::{ImageInfo, ResultsDescription, ReviewRecord, Session};
use crate::error::CheckpointError;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Paths written by one results export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsFiles {
    pub results: PathBuf,
    pub rejected: PathBuf,
    pub description: PathBuf,
}

pub struct CheckpointAdapter;

impl CheckpointAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn load_checkpoint(&self, path: &Path) -> Result<Session, CheckpointError> {
        let contents = fs::read_to_string(path)?;
        let session: Session = serde_json::from_str(&contents)?;
        log::info!("Checkpoint [{}] loaded successfully", session.timestamp);
        Ok(session)
    }

    pub fn save_checkpoint(&self, path: &Path, session: &Session) -> Result<(), CheckpointError> {
        if session.images_path.is_empty() {
            log::warn!("No images to save in checkpoint");
            return Err(CheckpointError::NoImages);
        }

        create_parent(path)?;
        let contents = serde_json::to_string_pretty(session)?;
        fs::write(path, contents)?;
        log::info!("Checkpoint saved [{}] to {}", session.timestamp, path.display());
        Ok(())
    }

    /// Writes `<name>.json` (every image), `<name>_rejected.json` and
    /// `<name>_description.json`, all as JSON Lines.
    pub fn save_results(&self, path: &Path, session: &Session) -> Result<ResultsFiles, CheckpointError> {
        if session.images_path.is_empty() {
            log::warn!("No images to save in results");
            return Err(CheckpointError::NoImages);
        }

        let files = results_files(path);
        if files.results.exists() {
            log::warn!("File {} already exists. Overwriting.", files.results.display());
        }

        let input_dir = session.input_dir.to_string_lossy().into_owned();
        let mut all = Vec::with_capacity(session.images_path.len());
        for (index, image) in session.images_path.iter().enumerate() {
            let info = ImageInfo::from_relative_path(image)?;
            all.push(ReviewRecord {
                subject: info.subject,
                image_name: info.image_name,
                repetition: info.repetition,
                path: image.clone(),
                rejected_images: session.is_rejected(index),
                input_dir: input_dir.clone(),
            });
        }
        let rejected: Vec<&ReviewRecord> = all.iter().filter(|r| r.rejected_images).collect();

        create_parent(&files.results)?;
        write_json_lines(&files.results, &all)?;
        log::info!("Results saved to {}", files.results.display());

        write_json_lines(&files.rejected, &rejected)?;
        log::info!("Rejected images saved to {}", files.rejected.display());

        let description = ResultsDescription {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            results: files.rejected.to_string_lossy().into_owned(),
            images_path: files.results.to_string_lossy().into_owned(),
        };
        write_json_lines(&files.description, &[description])?;
        log::info!("Description saved to {}", files.description.display());

        Ok(files)
    }
}

impl Default for CheckpointAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn create_parent(path: &Path) -> Result<(), CheckpointError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Sibling file names of a results export; `.json` is appended if missing.
pub fn results_files(path: &Path) -> ResultsFiles {
    let raw = path.to_string_lossy();
    let base = raw.strip_suffix(".json").unwrap_or(&raw);

    ResultsFiles {
        results: PathBuf::from(format!("{}.json", base)),
        rejected: PathBuf::from(format!("{}_rejected.json", base)),
        description: PathBuf::from(format!("{}_description.json", base)),
    }
}

fn write_json_lines<T: Serialize>(path: &Path, records: &[T]) -> Result<(), CheckpointError> {
    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    fs::write(path, out)?;
    Ok(())
}
