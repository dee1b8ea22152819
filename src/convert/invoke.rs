//! Running the office converter on one document

use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use crate::cancel::CancelFlag;
use crate::config::ConvertOptions;
use crate::convert::tool::ConverterEnv;
use crate::document::SourceDocument;
use crate::error::{Error, Result};

/// How often a running conversion is checked for exit, timeout and cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for output pipes to close once the child is gone
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// One document to convert into one output directory
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub source: SourceDocument,
    pub output_dir: PathBuf,
    /// File name of the finished PDF inside `output_dir`
    pub output_name: OsString,
}

impl ConversionJob {
    /// Job writing `<stem>.pdf`, the converter's own naming
    pub fn new(source: SourceDocument, output_dir: impl Into<PathBuf>) -> Self {
        let output_name = source.pdf_name();
        Self {
            source,
            output_dir: output_dir.into(),
            output_name,
        }
    }

    /// Store the result under `name` instead of `<stem>.pdf`
    pub fn with_output_name(mut self, name: impl Into<OsString>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Where the finished PDF ends up
    pub fn expected_output(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }
}

/// Invokes the external converter with a timeout and captured output
#[derive(Debug, Clone)]
pub struct Converter {
    tool: PathBuf,
    options: ConvertOptions,
    cancel: CancelFlag,
}

impl Converter {
    /// Build from a detected environment; fails when no converter was found
    pub fn new(env: &ConverterEnv, options: ConvertOptions) -> Result<Self> {
        Ok(Self::with_tool(env.require()?, options))
    }

    pub fn with_tool(tool: impl Into<PathBuf>, options: ConvertOptions) -> Self {
        Self {
            tool: tool.into(),
            options,
            cancel: CancelFlag::new(),
        }
    }

    /// Observe `cancel` while waiting on the converter
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn tool(&self) -> &Path {
        &self.tool
    }

    /// Convert one document, returning the produced PDF path
    ///
    /// A non-zero exit, a missing output file, or a timeout all yield
    /// `ConversionFailed`. A stale PDF with the target name is removed first
    /// so only this run's output counts as success. Jobs with a custom
    /// output name convert into a private staging directory and the result
    /// is renamed into place, so they never touch another job's `<stem>.pdf`.
    pub fn convert(&self, job: &ConversionJob) -> Result<PathBuf> {
        let source = job.source.path();
        if !source.is_file() {
            return Err(Error::FileNotFound(source.to_path_buf()));
        }

        fs::create_dir_all(&job.output_dir)?;
        let output_dir = std::path::absolute(&job.output_dir)?;
        let expected = output_dir.join(&job.output_name);
        if expected.exists() {
            debug!("removing stale {}", expected.display());
            fs::remove_file(&expected)?;
        }

        let staging = if job.output_name != job.source.pdf_name() {
            Some(
                tempfile::Builder::new()
                    .prefix(".converting-")
                    .tempdir_in(&output_dir)?,
            )
        } else {
            None
        };
        let work_dir = staging
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
            .unwrap_or_else(|| output_dir.clone());
        let produced = job.source.pdf_path_in(&work_dir);

        let mut command = Command::new(&self.tool);
        command
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(&work_dir)
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        own_process_group(&mut command);
        debug!("running {:?}", command);

        let child = command.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::ExternalToolMissing {
                searched: vec![self.tool.display().to_string()],
            },
            _ => Error::conversion(source, format!("could not start {}: {}", self.tool.display(), e)),
        })?;

        let finished = self.wait(child, source)?;
        let diagnostics = finished.diagnostics();

        if !finished.status.success() {
            return Err(Error::conversion(
                source,
                format!(
                    "converter exited with {}: {}",
                    finished.status,
                    if diagnostics.is_empty() { "no diagnostic output" } else { diagnostics.as_str() }
                ),
            ));
        }

        if !produced.is_file() {
            let mut reason = "converter finished but output PDF was not found".to_string();
            if !diagnostics.is_empty() {
                reason.push_str(": ");
                reason.push_str(&diagnostics);
            }
            return Err(Error::conversion(source, reason));
        }

        if produced != expected {
            fs::rename(&produced, &expected)?;
        }

        info!("converted {} -> {}", job.source.display_name(), expected.display());
        Ok(expected)
    }

    /// Wait for `child` to exit, killing it on timeout or cancellation
    fn wait(&self, mut child: Child, source: &Path) -> Result<Finished> {
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let deadline = Instant::now() + self.options.timeout;

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if self.cancel.is_cancelled() {
                terminate(&mut child);
                return Err(Error::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                terminate(&mut child);
                return Err(Error::conversion(
                    source,
                    format!("timed out after {:?}", self.options.timeout),
                ));
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        };

        Ok(Finished {
            status,
            stdout: stdout.recv_timeout(DRAIN_GRACE).unwrap_or_default(),
            stderr: stderr.recv_timeout(DRAIN_GRACE).unwrap_or_default(),
        })
    }
}

/// Convert `source` into `output_dir` with the given converter executable
///
/// The extension is checked before anything is spawned.
pub fn convert(tool: &Path, source: &Path, output_dir: &Path, options: &ConvertOptions) -> Result<PathBuf> {
    let document = SourceDocument::from_path(source)?;
    Converter::with_tool(tool, options.clone()).convert(&ConversionJob::new(document, output_dir))
}

struct Finished {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl Finished {
    /// The converter's own words: stderr, or stdout when stderr is empty
    fn diagnostics(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr).trim().to_string();
        if !stderr.is_empty() {
            return stderr;
        }
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }
}

/// Read a child pipe to the end on a helper thread
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }
    rx
}

/// Start the converter as leader of a new process group
///
/// `soffice` is a launcher; the real converter runs as its descendant and
/// has to go down with it.
#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

/// Kill the converter and everything it started, then reap it
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        // Group id equals the leader's pid
        let group = format!("-{}", child.id());
        let killed = Command::new("kill")
            .args(["-KILL", "--", group.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(e) = killed {
            debug!("could not signal process group {}: {}", group, e);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}
