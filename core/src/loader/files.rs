use std::{
    io,
    path::{Path, PathBuf},
};
use glob::glob;
use walkdir::WalkDir;

use super::LoaderError;

/// Expands a path or glob pattern into the files it names; directories are walked
/// recursively. Matches come back in the order `glob` yields them.
pub(super) fn resolve_input_to_files(input: &str) -> Result<Vec<PathBuf>, LoaderError> {
    let mut files = Vec::new();

    for entry in glob(input)? {
        let path = entry.map_err(|e| LoaderError::Io(e.into()))?;
        if path.is_dir() {
            for entry in WalkDir::new(&path).sort_by_file_name() {
                let entry = entry.map_err(|e| LoaderError::Io(e.into()))?;
                if entry.file_type().is_file() {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else if path.is_file() {
            files.push(path);
        }
    }

    Ok(files)
}

#[cfg(feature = "pdf")]
pub(super) fn parse_file(file_path: &Path) -> io::Result<String> {
    if file_path.extension().is_some_and(|ext| ext == "pdf") {
        return pdf_extract::extract_text(file_path)
            .map_err(|e| io::Error::other(format!("Failed to parse PDF: {e}")));
    }
    std::fs::read_to_string(file_path)
}

#[cfg(not(feature = "pdf"))]
pub(super) fn parse_file(file_path: &Path) -> io::Result<String> {
    std::fs::read_to_string(file_path)
}
