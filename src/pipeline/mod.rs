//! Convert, order and merge: the run as a whole

pub mod plan;
pub mod report;
pub mod run;

// Re-export commonly used items
pub use plan::{normalize_output_name, plan_run, Frontend};
pub use report::{ConversionOutcome, MergeStatus, RunReport, RunSummary};
pub use run::{resolve_order, DocumentConverter, MergeSource, NoProgress, Pipeline, ProgressSink, RunRequest};
