use super::error::IngestError;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const RECORD_FILE_EXTENSION: &str = "json";

/// All `.json` files under `root`, recursively, in file-name order per directory.
pub fn find_record_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(IngestError::MissingSource(root.to_path_buf()).into());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", root))?;
        let is_record_file = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .is_some_and(|ext| ext == RECORD_FILE_EXTENSION);
        if is_record_file {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
