//! Run configuration shared by the library and the CLI

use std::path::PathBuf;
use std::time::Duration;

/// Per-conversion time limit used when none is given
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Directory (relative to the source directory) receiving converted PDFs
pub const CONVERTED_SUBDIR: &str = "converted_pdfs";

/// Options controlling each converter invocation
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Upper bound on a single conversion; the child is killed past it
    pub timeout: Duration,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Where a run reads sources from and writes results to
#[derive(Debug, Clone)]
pub struct Layout {
    /// Directory holding the documents and receiving the merged PDF
    pub source_dir: PathBuf,
    /// Directory receiving converted PDFs
    pub converted_dir: PathBuf,
}

impl Layout {
    /// Standard layout: converted PDFs go to `<source_dir>/converted_pdfs`
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        let source_dir = source_dir.into();
        let converted_dir = source_dir.join(CONVERTED_SUBDIR);
        Self {
            source_dir,
            converted_dir,
        }
    }

    /// Default merged filename, `<dir name>_merged.pdf`
    pub fn default_output_name(&self) -> String {
        let stem = self
            .source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "merged_output".to_string());
        format!("{stem}_merged.pdf")
    }

    /// Full path of a merged file named `name` in the source directory
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.source_dir.join(name)
    }
}
