//! Outcome of one pipeline run

use std::fmt;
use std::path::{Path, PathBuf};
use crate::document::SourceDocument;
use crate::error::{Error, Result};
use crate::pdf::MergedOutput;

/// Result of converting one selected document
#[derive(Debug)]
pub struct ConversionOutcome {
    pub source: SourceDocument,
    /// Produced PDF, or why there is none
    pub result: Result<PathBuf>,
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// What happened at the merge step
#[derive(Debug)]
pub enum MergeStatus {
    Merged(MergedOutput),
    Failed(Error),
    /// Merge was not attempted; the reason is shown to the user
    Skipped(String),
}

/// Aggregate result of conversion and merge
#[derive(Debug)]
pub struct RunReport {
    /// One outcome per attempted job, in selection order
    pub conversions: Vec<ConversionOutcome>,
    pub merge: MergeStatus,
    /// The run stopped early on request
    pub cancelled: bool,
}

impl RunReport {
    /// Successfully converted documents with their PDFs
    pub fn converted(&self) -> impl Iterator<Item = (&SourceDocument, &Path)> {
        self.conversions
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|pdf| (&o.source, pdf.as_path())))
    }

    /// Failed conversions with their errors
    pub fn failed(&self) -> impl Iterator<Item = (&SourceDocument, &Error)> {
        self.conversions
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.source, e)))
    }

    pub fn merged(&self) -> Option<&MergedOutput> {
        match &self.merge {
            MergeStatus::Merged(output) => Some(output),
            _ => None,
        }
    }

    pub fn merge_failed(&self) -> bool {
        matches!(self.merge, MergeStatus::Failed(_))
    }

    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary {
            converted: self.converted().count(),
            failed: self.failed().count(),
            merged_pages: self.merged().map(|m| m.page_count).unwrap_or(0),
            merge: &self.merge,
            cancelled: self.cancelled,
        }
    }
}

/// Counts shown at the end of a run
#[derive(Debug)]
pub struct RunSummary<'a> {
    pub converted: usize,
    pub failed: usize,
    pub merged_pages: usize,
    pub merge: &'a MergeStatus,
    pub cancelled: bool,
}

impl fmt::Display for RunSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Converted:     {}", self.converted)?;
        writeln!(f, "Failed:        {}", self.failed)?;
        writeln!(f, "Merged pages:  {}", self.merged_pages)?;
        match self.merge {
            MergeStatus::Merged(output) => write!(
                f,
                "Merge:         {} PDFs written to {}",
                output.entries.len(),
                output.path.display()
            )?,
            MergeStatus::Failed(e) => write!(f, "Merge:         failed ({e})")?,
            MergeStatus::Skipped(reason) => write!(f, "Merge:         skipped ({reason})")?,
        }
        if self.cancelled {
            write!(f, "\nRun cancelled before all jobs finished")?;
        }
        Ok(())
    }
}
