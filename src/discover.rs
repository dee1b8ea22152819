//! Directory scanning for convertible documents and existing PDFs

use std::path::{Path, PathBuf};
use glob::{glob_with, MatchOptions, Pattern};
use tracing::{debug, warn};
use crate::document::{extension_of, kind_for_extension, SourceDocument};
use crate::error::{Error, Result};

/// List the regular files directly inside `dir`, sorted by path
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let pattern = format!("{}/*", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let mut files = Vec::new();
    let entries = glob_with(&pattern, options)
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())))?;
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("skipping unreadable entry in {}: {}", dir.display(), e),
        }
    }

    files.sort();
    Ok(files)
}

/// Find documents in `dir` that the converter can turn into PDFs
///
/// Not recursive. Results are sorted by file name.
pub fn find_convertible(dir: &Path) -> Result<Vec<SourceDocument>> {
    let mut documents = Vec::new();
    for path in list_files(dir)? {
        if kind_for_extension(&extension_of(&path)).is_some() {
            documents.push(SourceDocument::from_path(&path)?);
        }
    }
    debug!("found {} convertible documents in {}", documents.len(), dir.display());
    Ok(documents)
}

/// Find PDF files directly inside `dir`, sorted by file name
pub fn find_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let pdfs: Vec<PathBuf> = list_files(dir)?
        .into_iter()
        .filter(|p| extension_of(p) == "pdf")
        .collect();
    debug!("found {} PDFs in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}
