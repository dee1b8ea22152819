//! Source documents and the formats handed to the converter

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use crate::error::{Error, Result};

/// Broad family of an office document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Presentation,
    Text,
    Spreadsheet,
}

/// Extensions passed to the converter, lower-case, without the dot
const SUPPORTED_FORMATS: &[(&str, DocumentKind)] = &[
    ("pptx", DocumentKind::Presentation),
    ("ppt", DocumentKind::Presentation),
    ("pps", DocumentKind::Presentation),
    ("ppsx", DocumentKind::Presentation),
    ("odp", DocumentKind::Presentation),
    ("docx", DocumentKind::Text),
    ("doc", DocumentKind::Text),
    ("odt", DocumentKind::Text),
    ("rtf", DocumentKind::Text),
    ("xlsx", DocumentKind::Spreadsheet),
    ("xls", DocumentKind::Spreadsheet),
    ("ods", DocumentKind::Spreadsheet),
];

/// Look up the kind for an extension (case-insensitive, no leading dot)
pub fn kind_for_extension(extension: &str) -> Option<DocumentKind> {
    let extension = extension.to_ascii_lowercase();
    SUPPORTED_FORMATS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, kind)| *kind)
}

/// Lower-cased extension of `path`, empty when it has none
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// An office document picked for conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    path: PathBuf,
    extension: String,
    kind: DocumentKind,
}

impl SourceDocument {
    /// Build from a path, rejecting extensions the converter is not asked to handle.
    ///
    /// The path is made absolute against the current directory; it is not
    /// required to exist yet.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = std::path::absolute(path.as_ref())?;
        let extension = extension_of(&path);
        let kind = kind_for_extension(&extension).ok_or_else(|| Error::UnsupportedFormat {
            path: path.clone(),
            extension: extension.clone(),
        })?;

        Ok(Self {
            path,
            extension,
            kind,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// File name shown in prompts and reports
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// File name the converter gives the PDF: the source stem plus `.pdf`
    pub fn pdf_name(&self) -> OsString {
        let mut name = self
            .path
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        name.push(".pdf");
        name
    }

    /// Path of the PDF the converter writes for this document into `output_dir`
    pub fn pdf_path_in(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.pdf_name())
    }
}

/// Distinct PDF names for converting `documents` into one directory
///
/// The first document with a given stem keeps `<stem>.pdf`. Later ones get
/// `<stem> (<ext>).pdf`, then `<stem> (<ext> 2).pdf` and so on. Names are
/// compared case-insensitively.
pub fn pdf_names(documents: &[SourceDocument]) -> Vec<OsString> {
    let mut taken: HashSet<String> = HashSet::new();

    documents
        .iter()
        .map(|doc| {
            let stem = doc
                .path
                .file_stem()
                .map(|s| s.to_os_string())
                .unwrap_or_default();
            let mut name = doc.pdf_name();
            let mut attempt = 1;
            while !taken.insert(name.to_string_lossy().to_lowercase()) {
                let suffix = if attempt == 1 {
                    format!(" ({}).pdf", doc.extension)
                } else {
                    format!(" ({} {}).pdf", doc.extension, attempt)
                };
                name = stem.clone();
                name.push(suffix);
                attempt += 1;
            }
            name
        })
        .collect()
}
