//! Office PDF Merge CLI tool
//!
//! Interactive front end: pick documents, convert them with LibreOffice,
//! choose a merge order and write one PDF.

use anyhow::{bail, Context, Result};
use clap::Parser;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use office_pdf_merge::cancel::CancelFlag;
use office_pdf_merge::config::{ConvertOptions, Layout, DEFAULT_TIMEOUT};
use office_pdf_merge::convert::{Converter, ConverterEnv};
use office_pdf_merge::document::SourceDocument;
use office_pdf_merge::pipeline::{
    normalize_output_name, plan_run, ConversionOutcome, Frontend, MergeSource, MergeStatus,
    Pipeline, ProgressSink,
};
use office_pdf_merge::Error;

fn use_color() -> bool {
    color_enabled(io::stderr().is_terminal(), env::var_os("NO_COLOR"))
}

/// Colour only an interactive stderr, and never when NO_COLOR is set to a
/// non-empty value
fn color_enabled(is_terminal: bool, no_color: Option<OsString>) -> bool {
    is_terminal && no_color.map_or(true, |v| v.is_empty())
}

fn paint(code: &str, s: &str) -> String {
    if use_color() {
        format!("\x1b[{code}m{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

fn green(s: &str) -> String {
    paint("32", s)
}
fn red(s: &str) -> String {
    paint("31", s)
}
fn yellow(s: &str) -> String {
    paint("33", s)
}
fn bold(s: &str) -> String {
    paint("1", s)
}

/// Office PDF Merge - convert office documents and merge PDFs
#[derive(Parser)]
#[command(name = "office-pdf-merge")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Fully interactive
    office-pdf-merge

    # Start in a directory and pre-fill the merged file name
    office-pdf-merge --dir ~/lectures/week3 --output week3.pdf

    # Only merge PDFs that already exist
    office-pdf-merge --merge-only")]
struct Cli {
    /// Directory containing the files to process (prompted for when omitted)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Name of the merged PDF, written into the source directory
    #[arg(short, long)]
    output: Option<String>,

    /// Seconds allowed for each conversion before the converter is killed
    #[arg(long, env = "OFFICE_PDF_MERGE_TIMEOUT", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Converter executable to use instead of searching PATH
    #[arg(long, env = "OFFICE_PDF_MERGE_CONVERTER")]
    converter: Option<PathBuf>,

    /// Skip conversion and only merge existing PDFs
    #[arg(long)]
    merge_only: bool,

    /// Overwrite an existing merged file without asking
    #[arg(short, long)]
    yes: bool,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Hide progress bars
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", red("Error:"), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut frontend = TerminalFrontend {
        preset_output: cli.output.clone(),
        assume_yes: cli.yes,
    };

    let env = converter_env(&cli)?;

    let source_dir = match cli.dir {
        Some(dir) => dir,
        None => prompt_directory()?,
    };
    if !source_dir.is_dir() {
        bail!("Not a directory: {}", source_dir.display());
    }
    let source_dir = source_dir
        .canonicalize()
        .with_context(|| format!("Cannot resolve {}", source_dir.display()))?;
    let layout = Layout::new(source_dir);
    eprintln!("Using source directory: {}", layout.source_dir.display());

    let Some(request) = plan_run(&mut frontend, &layout, &env)? else {
        eprintln!("{}", yellow("Nothing selected. Exiting."));
        return Ok(());
    };

    if request.output_path.is_some() {
        eprintln!("\n{}", bold("Files will be merged in this order:"));
        for (i, item) in request.order.iter().enumerate() {
            eprintln!("  {}. {}", i + 1, describe(item));
        }
    }

    let options = ConvertOptions {
        timeout: Duration::from_secs(cli.timeout),
    };
    let converter = match env.tool() {
        Some(_) => Some(Converter::new(&env, options)?),
        None => None,
    };

    let progress: Box<dyn ProgressSink> = if cli.quiet {
        Box::new(CliProgress::new(ProgressBar::hidden()))
    } else {
        Box::new(CliProgress::new(ProgressBar::new(0)))
    };
    let pipeline = Pipeline::with_converter(converter, &layout.converted_dir).with_progress(progress);
    cancel_on_interrupt(pipeline.cancel_flag());
    let report = pipeline.run(&request)?;

    let failures: Vec<_> = report.failed().collect();
    if !failures.is_empty() {
        eprintln!("\n{}", yellow("Conversion issues:"));
        for (source, error) in failures {
            eprintln!("  - {}: {}", source.display_name(), error);
        }
    }

    eprintln!("\n{}", bold("Summary"));
    eprintln!("{}", report.summary());

    if let MergeStatus::Failed(e) = &report.merge {
        bail!("Merging failed: {}", e);
    }
    if report.cancelled {
        bail!(Error::Cancelled);
    }
    Ok(())
}

/// Decide which converter to use, asking whether to continue without one
fn converter_env(cli: &Cli) -> Result<ConverterEnv> {
    if cli.merge_only {
        return Ok(ConverterEnv::default());
    }

    if let Some(path) = &cli.converter {
        let env = ConverterEnv::with_tool(path);
        // An explicit choice that does not work is an error, not a prompt
        let tool = env.require()?;
        eprintln!("{} {}", green("Using converter:"), tool.display());
        return Ok(env);
    }

    let env = ConverterEnv::detect();
    if let Some(tool) = env.tool() {
        eprintln!("{} {}", green("Found converter:"), tool.display());
        return Ok(env);
    }

    let missing = env.require().err().unwrap_or(Error::ExternalToolMissing { searched: Vec::new() });
    eprintln!("{} {}", red("Error:"), missing);
    eprintln!("Install LibreOffice to enable conversion, for example:");
    eprintln!("  - sudo apt install libreoffice (Debian/Ubuntu)");
    eprintln!("  - sudo dnf install libreoffice (Fedora)");
    eprintln!("  - sudo pacman -S libreoffice-still (Arch)");

    // Asked even with --yes, which only covers overwriting
    let merge_only = Confirm::new()
        .with_prompt("Proceed with PDF merging only (requires existing PDFs)?")
        .default(false)
        .interact()
        .map_err(prompt_error)?;
    if merge_only {
        Ok(env)
    } else {
        Err(missing.into())
    }
}

/// First Ctrl-C cancels the run at the next safe point, a second one exits
///
/// The converter runs in its own process group, so the terminal's SIGINT
/// no longer reaches it; cancellation kills it instead. A merge already in
/// progress finishes, so no temporary file is left next to the output.
fn cancel_on_interrupt(cancel: CancelFlag) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Ctrl-C handling unavailable: {}", e);
                return;
            }
        };

        runtime.block_on(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            eprintln!("\n{}", yellow("Interrupted: stopping after the current step (Ctrl-C again to quit now)"));
            cancel.cancel();

            if tokio::signal::ctrl_c().await.is_ok() {
                process::exit(130);
            }
        });
    });
}

fn prompt_directory() -> Result<PathBuf> {
    let dir: String = Input::new()
        .with_prompt("Directory containing the files to process")
        .default(".".to_string())
        .validate_with(|input: &String| -> Result<(), String> {
            if PathBuf::from(input).is_dir() {
                Ok(())
            } else {
                Err(format!("'{}' is not a directory", input))
            }
        })
        .interact_text()
        .context("Directory prompt aborted")?;
    Ok(PathBuf::from(dir))
}

fn describe(item: &MergeSource) -> String {
    match item {
        MergeSource::Converted(source) => {
            let name = SourceDocument::from_path(source)
                .map(|d| d.display_name())
                .unwrap_or_else(|_| source.display().to_string());
            format!("{} (converted)", name)
        }
        MergeSource::Existing(path) => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    }
}

/// dialoguer-backed answers to the pipeline's questions
struct TerminalFrontend {
    /// Name from `--output`, used for the first filename question
    preset_output: Option<String>,
    /// `--yes`: confirm everything without asking
    assume_yes: bool,
}

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::Prompt(e.to_string())
}

impl Frontend for TerminalFrontend {
    fn select_files(&mut self, prompt: &str, items: &[String]) -> office_pdf_merge::Result<Vec<usize>> {
        MultiSelect::new()
            .with_prompt(format!("{prompt} (space to toggle, enter to confirm)"))
            .items(items)
            .interact()
            .map_err(prompt_error)
    }

    /// Build the order one position at a time from the files not yet placed
    fn order_files(&mut self, items: &[String]) -> office_pdf_merge::Result<Vec<usize>> {
        let mut remaining: Vec<usize> = (0..items.len()).collect();
        let mut order = Vec::with_capacity(items.len());

        while remaining.len() > 1 {
            let labels: Vec<&String> = remaining.iter().map(|&i| &items[i]).collect();
            let picked = Select::new()
                .with_prompt(format!("File for position #{}", order.len() + 1))
                .items(&labels)
                .default(0)
                .interact()
                .map_err(prompt_error)?;
            order.push(remaining.remove(picked));
        }
        order.extend(remaining);

        Ok(order)
    }

    fn output_filename(&mut self, default: &str) -> office_pdf_merge::Result<String> {
        if let Some(name) = self.preset_output.take() {
            return Ok(name);
        }

        Input::new()
            .with_prompt("Name for the merged PDF")
            .default(default.to_string())
            .validate_with(|input: &String| -> Result<(), String> {
                normalize_output_name(input).map(|_| ()).map_err(|e| e.to_string())
            })
            .interact_text()
            .map_err(prompt_error)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> office_pdf_merge::Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(prompt_error)
    }
}

/// Terminal progress: one bar for the conversion batch, a spinner for the merge
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl ProgressSink for CliProgress {
    fn on_conversion_start(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold} [{bar:40.green/238}] {pos}/{len}  {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");

        self.bar.set_style(style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix("Converting");
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn on_job_start(&self, _index: usize, _total: usize, source: &SourceDocument) {
        self.bar.set_message(source.display_name());
    }

    fn on_job_finish(&self, _index: usize, _total: usize, outcome: &ConversionOutcome) {
        match &outcome.result {
            Ok(_) => self.bar.println(format!("  {} {}", green("✓"), outcome.source.display_name())),
            Err(e) => self.bar.println(format!("  {} {}", red("✗"), e)),
        }
        self.bar.inc(1);
    }

    fn on_merge_start(&self, inputs: usize) {
        self.bar.finish_and_clear();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        self.bar.reset();
        self.bar.set_style(style);
        self.bar.set_message(format!("Merging {inputs} PDFs..."));
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn on_merge_finish(&self, status: &MergeStatus) {
        self.bar.finish_and_clear();
        match status {
            MergeStatus::Merged(output) => eprintln!(
                "{} {} ({} pages)",
                green("Merged into:"),
                output.path.display(),
                output.page_count
            ),
            MergeStatus::Failed(e) => eprintln!("{} {}", red("Merge failed:"), e),
            MergeStatus::Skipped(reason) => eprintln!("{} {}", yellow("Merge skipped:"), reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_needs_a_terminal() {
        assert!(color_enabled(true, None));
        assert!(!color_enabled(false, None));
    }

    #[test]
    fn test_non_empty_no_color_wins_over_terminal() {
        assert!(!color_enabled(true, Some(OsString::from("1"))));
        assert!(color_enabled(true, Some(OsString::new())));
    }
}
