//! Conversion batch followed by an ordered merge

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use crate::cancel::CancelFlag;
use crate::convert::{ConversionJob, Converter, CONVERTER_NAMES};
use crate::document::{pdf_names, SourceDocument};
use crate::error::{Error, Result};
use crate::pdf::{merge_pdfs, MergeOptions};
use crate::pipeline::report::{ConversionOutcome, MergeStatus, RunReport};

/// Anything that can turn one conversion job into a PDF
pub trait DocumentConverter {
    fn convert(&self, job: &ConversionJob) -> Result<PathBuf>;
}

impl DocumentConverter for Converter {
    fn convert(&self, job: &ConversionJob) -> Result<PathBuf> {
        Converter::convert(self, job)
    }
}

/// Receives pipeline events; all methods default to no-ops
pub trait ProgressSink {
    fn on_conversion_start(&self, total: usize) {
        let _ = total;
    }

    /// `index` is 0-based
    fn on_job_start(&self, index: usize, total: usize, source: &SourceDocument) {
        let _ = (index, total, source);
    }

    fn on_job_finish(&self, index: usize, total: usize, outcome: &ConversionOutcome) {
        let _ = (index, total, outcome);
    }

    fn on_merge_start(&self, inputs: usize) {
        let _ = inputs;
    }

    fn on_merge_finish(&self, status: &MergeStatus) {
        let _ = status;
    }
}

/// Progress sink that ignores everything
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// One item of the user's merge order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeSource {
    /// The PDF produced from this source document, if its conversion succeeds
    Converted(PathBuf),
    /// A PDF that already exists on disk
    Existing(PathBuf),
}

impl MergeSource {
    pub fn converted(source: &SourceDocument) -> Self {
        MergeSource::Converted(source.path().to_path_buf())
    }

    pub fn existing(path: impl Into<PathBuf>) -> Self {
        MergeSource::Existing(path.into())
    }
}

/// Everything a run needs to know, decided up front
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Documents to convert, in conversion order
    pub selection: Vec<SourceDocument>,
    /// Merge order over converted and existing PDFs
    pub order: Vec<MergeSource>,
    /// Merged file to write; `None` converts only
    pub output_path: Option<PathBuf>,
    /// Replace `output_path` if present (confirmed by the user beforehand)
    pub overwrite: bool,
}

/// Sequential convert-then-merge driver
pub struct Pipeline {
    converter: Option<Box<dyn DocumentConverter>>,
    output_dir: PathBuf,
    cancel: CancelFlag,
    progress: Box<dyn ProgressSink>,
}

impl Pipeline {
    /// `converter` is `None` when no converter is installed; runs that
    /// select documents for conversion then fail up front.
    pub fn new(converter: Option<Box<dyn DocumentConverter>>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            converter,
            output_dir: output_dir.into(),
            cancel: CancelFlag::new(),
            progress: Box::new(NoProgress),
        }
    }

    /// Pipeline using the process-based converter, sharing its cancel flag
    pub fn with_converter(converter: Option<Converter>, output_dir: impl Into<PathBuf>) -> Self {
        let cancel = CancelFlag::new();
        let converter = converter.map(|c| {
            Box::new(c.with_cancel(cancel.clone())) as Box<dyn DocumentConverter>
        });
        Self {
            cancel,
            ..Self::new(converter, output_dir)
        }
    }

    /// Flag checked between jobs; cancel it to stop the batch early
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Convert the selection, then merge in the requested order
    ///
    /// Individual conversion failures are recorded and skipped. A merge
    /// failure is recorded in the report; converted PDFs stay on disk. The
    /// only error returned is a missing converter: either none was given
    /// while documents are selected, or the first job finds it gone, which
    /// stops the batch.
    pub fn run(&self, request: &RunRequest) -> Result<RunReport> {
        if !request.selection.is_empty() && self.converter.is_none() {
            return Err(Error::ExternalToolMissing {
                searched: CONVERTER_NAMES.iter().map(|s| s.to_string()).collect(),
            });
        }

        let (conversions, cancelled) = self.convert_all(&request.selection)?;
        let cancelled = cancelled || self.cancel.is_cancelled();

        let merge = if cancelled {
            MergeStatus::Skipped("run cancelled".to_string())
        } else {
            self.merge_step(request, &conversions)
        };

        Ok(RunReport {
            conversions,
            merge,
            cancelled,
        })
    }

    fn convert_all(&self, selection: &[SourceDocument]) -> Result<(Vec<ConversionOutcome>, bool)> {
        let total = selection.len();
        let mut conversions = Vec::with_capacity(total);

        let Some(converter) = self.converter.as_deref() else {
            return Ok((conversions, false));
        };
        if total == 0 {
            return Ok((conversions, false));
        }

        info!("converting {} documents into {}", total, self.output_dir.display());
        self.progress.on_conversion_start(total);

        let names = pdf_names(selection);
        for (index, (source, name)) in selection.iter().zip(names).enumerate() {
            if self.cancel.is_cancelled() {
                info!("cancelled after {} of {} jobs", index, total);
                return Ok((conversions, true));
            }

            self.progress.on_job_start(index, total, source);
            let job = ConversionJob::new(source.clone(), &self.output_dir).with_output_name(name);
            let result = converter.convert(&job);
            if let Err(e @ Error::ExternalToolMissing { .. }) = result {
                error!("{}", e);
                return Err(e);
            }
            let cancelled = matches!(result, Err(Error::Cancelled));
            if let Err(e) = &result {
                warn!("{}", e);
            }

            let outcome = ConversionOutcome {
                source: source.clone(),
                result,
            };
            self.progress.on_job_finish(index, total, &outcome);
            conversions.push(outcome);

            if cancelled {
                return Ok((conversions, true));
            }
        }

        Ok((conversions, false))
    }

    fn merge_step(&self, request: &RunRequest, conversions: &[ConversionOutcome]) -> MergeStatus {
        let Some(output_path) = &request.output_path else {
            return MergeStatus::Skipped("no merged file requested".to_string());
        };

        let input_paths = resolve_order(&request.order, conversions);
        if input_paths.is_empty() {
            return MergeStatus::Skipped("no PDFs left to merge".to_string());
        }

        self.progress.on_merge_start(input_paths.len());
        let options = MergeOptions {
            input_paths,
            output_path: output_path.clone(),
            overwrite: request.overwrite,
        };
        let status = match merge_pdfs(&options) {
            Ok(merged) => MergeStatus::Merged(merged),
            Err(e) => {
                error!("merge failed: {}", e);
                MergeStatus::Failed(e)
            }
        };
        self.progress.on_merge_finish(&status);
        status
    }
}

/// Turn the user's order into concrete PDF paths
///
/// Converted items whose conversion failed or never ran are dropped; the
/// relative order of everything else is kept.
pub fn resolve_order(order: &[MergeSource], conversions: &[ConversionOutcome]) -> Vec<PathBuf> {
    order
        .iter()
        .filter_map(|item| match item {
            MergeSource::Existing(path) => Some(path.clone()),
            MergeSource::Converted(source) => {
                let produced = conversions
                    .iter()
                    .find(|o| o.source.path() == source)
                    .and_then(|o| o.result.as_ref().ok())
                    .cloned();
                if produced.is_none() {
                    warn!("leaving {} out of the merge: no converted PDF", source.display());
                }
                produced
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Succeeds for every job except the named stems
    struct StubConverter {
        failing: Vec<&'static str>,
    }

    impl DocumentConverter for StubConverter {
        fn convert(&self, job: &ConversionJob) -> Result<PathBuf> {
            let name = job.source.display_name();
            if self.failing.iter().any(|f| name.starts_with(f)) {
                return Err(Error::conversion(job.source.path(), "stub failure"));
            }
            Ok(job.expected_output())
        }
    }

    fn doc(name: &str) -> SourceDocument {
        SourceDocument::from_path(format!("/src/{name}")).unwrap()
    }

    #[test]
    fn test_resolve_order_drops_failed_conversions() {
        let a = doc("a.pptx");
        let b = doc("b.pptx");
        let conversions = vec![
            ConversionOutcome { source: a.clone(), result: Ok(PathBuf::from("/out/a.pdf")) },
            ConversionOutcome { source: b.clone(), result: Err(Error::conversion(b.path(), "boom")) },
        ];
        let order = vec![
            MergeSource::existing("/src/cover.pdf"),
            MergeSource::converted(&b),
            MergeSource::converted(&a),
        ];

        assert_eq!(
            resolve_order(&order, &conversions),
            vec![PathBuf::from("/src/cover.pdf"), PathBuf::from("/out/a.pdf")]
        );
    }

    #[test]
    fn test_missing_converter_fails_before_any_job() {
        let pipeline = Pipeline::new(None, "/out");
        let request = RunRequest {
            selection: vec![doc("a.pptx")],
            ..RunRequest::default()
        };
        assert!(matches!(
            pipeline.run(&request),
            Err(Error::ExternalToolMissing { .. })
        ));
    }

    #[test]
    fn test_batch_continues_past_failures() {
        let stub = StubConverter { failing: vec!["b"] };
        let pipeline = Pipeline::new(Some(Box::new(stub)), "/out");
        let request = RunRequest {
            selection: vec![doc("a.pptx"), doc("b.pptx"), doc("c.pptx")],
            ..RunRequest::default()
        };

        let report = pipeline.run(&request).unwrap();
        let summary = report.summary();
        assert_eq!(summary.converted, 2);
        assert_eq!(summary.failed, 1);
        assert!(matches!(report.merge, MergeStatus::Skipped(_)));
    }

    #[test]
    fn test_cancel_stops_before_next_job() {
        let pipeline = Pipeline::new(
            Some(Box::new(StubConverter { failing: vec![] })),
            "/out",
        );
        pipeline.cancel_flag().cancel();

        let request = RunRequest {
            selection: vec![doc("a.pptx"), doc("b.pptx")],
            order: vec![MergeSource::existing("/src/x.pdf")],
            output_path: Some(PathBuf::from("/src/out.pdf")),
            overwrite: false,
        };
        let report = pipeline.run(&request).unwrap();
        assert!(report.cancelled);
        assert!(report.conversions.is_empty());
        assert!(matches!(report.merge, MergeStatus::Skipped(_)));
    }

    /// Reports the tool as gone, counting how often it was asked
    struct VanishedTool {
        calls: Rc<Cell<usize>>,
    }

    impl DocumentConverter for VanishedTool {
        fn convert(&self, _job: &ConversionJob) -> Result<PathBuf> {
            self.calls.set(self.calls.get() + 1);
            Err(Error::ExternalToolMissing {
                searched: vec!["/opt/gone/soffice".to_string()],
            })
        }
    }

    #[test]
    fn test_missing_tool_mid_run_stops_the_batch() {
        let calls = Rc::new(Cell::new(0));
        let pipeline = Pipeline::new(
            Some(Box::new(VanishedTool { calls: calls.clone() })),
            "/out",
        );
        let request = RunRequest {
            selection: vec![doc("a.pptx"), doc("b.pptx"), doc("c.pptx")],
            ..RunRequest::default()
        };

        assert!(matches!(
            pipeline.run(&request),
            Err(Error::ExternalToolMissing { .. })
        ));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_shared_stems_get_distinct_outputs() {
        let pipeline = Pipeline::new(
            Some(Box::new(StubConverter { failing: vec![] })),
            "/out",
        );
        let request = RunRequest {
            selection: vec![doc("report.pptx"), doc("report.odp")],
            ..RunRequest::default()
        };

        let report = pipeline.run(&request).unwrap();
        let outputs: Vec<&Path> = report.converted().map(|(_, pdf)| pdf).collect();
        assert_eq!(
            outputs,
            vec![Path::new("/out/report.pdf"), Path::new("/out/report (odp).pdf")]
        );
    }

    /// Converts everything, pulling the stop signal while handling `last`
    struct InterruptedDuring {
        last: &'static str,
        cancel: Rc<RefCell<Option<CancelFlag>>>,
    }

    impl DocumentConverter for InterruptedDuring {
        fn convert(&self, job: &ConversionJob) -> Result<PathBuf> {
            if job.source.display_name() == self.last {
                if let Some(cancel) = self.cancel.borrow().as_ref() {
                    cancel.cancel();
                }
            }
            Ok(job.expected_output())
        }
    }

    #[test]
    fn test_cancel_during_last_job_skips_the_merge() {
        let cancel = Rc::new(RefCell::new(None));
        let pipeline = Pipeline::new(
            Some(Box::new(InterruptedDuring { last: "b.pptx", cancel: cancel.clone() })),
            "/out",
        );
        *cancel.borrow_mut() = Some(pipeline.cancel_flag());

        let a = doc("a.pptx");
        let b = doc("b.pptx");
        let request = RunRequest {
            selection: vec![a.clone(), b.clone()],
            order: vec![MergeSource::converted(&a), MergeSource::converted(&b)],
            output_path: Some(PathBuf::from("/src/out.pdf")),
            overwrite: false,
        };

        let report = pipeline.run(&request).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.summary().converted, 2);
        assert!(matches!(report.merge, MergeStatus::Skipped(_)));
    }
}
