//! Turning user choices into a `RunRequest`
//!
//! The pipeline never talks to a terminal directly. A [`Frontend`] answers a
//! handful of synchronous questions and [`plan_run`] assembles the answers
//! into a [`RunRequest`]; any TUI, GUI or scripted driver can implement it.

use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;
use crate::config::Layout;
use crate::convert::ConverterEnv;
use crate::discover::{find_convertible, find_pdfs};
use crate::document::{pdf_names, SourceDocument};
use crate::error::{Error, Result};
use crate::pdf::count_pages;
use crate::pipeline::run::{MergeSource, RunRequest};

/// Synchronous request/response interface to whoever drives a run
pub trait Frontend {
    /// Pick any subset of `items`; returns indices into `items`
    fn select_files(&mut self, prompt: &str, items: &[String]) -> Result<Vec<usize>>;

    /// Arrange `items`; returns every index of `items` exactly once, in merge order
    fn order_files(&mut self, items: &[String]) -> Result<Vec<usize>>;

    /// Name for the merged file, offered `default`
    fn output_filename(&mut self, default: &str) -> Result<String>;

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;
}

/// Validate a merged-file name, appending `.pdf` when it is missing
pub fn normalize_output_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidOutputName("filename cannot be empty".to_string()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidOutputName(format!(
            "'{name}' must be a file name, not a path"
        )));
    }
    if name.to_ascii_lowercase().ends_with(".pdf") {
        Ok(name.to_string())
    } else {
        Ok(format!("{name}.pdf"))
    }
}

/// Label shown for a candidate PDF
fn pdf_label(layout: &Layout, path: &std::path::Path) -> String {
    let shown = path
        .strip_prefix(&layout.source_dir)
        .unwrap_or(path)
        .display()
        .to_string();
    match count_pages(path) {
        Ok(1) => format!("{shown} (1 page)"),
        Ok(n) => format!("{shown} ({n} pages)"),
        Err(_) => format!("{shown} (unreadable)"),
    }
}

fn check_order(order: &[usize], len: usize) -> Result<()> {
    let unique: HashSet<usize> = order.iter().copied().collect();
    if order.len() != len || unique.len() != len || order.iter().any(|&i| i >= len) {
        return Err(Error::Prompt(
            "merge order must list every selected file exactly once".to_string(),
        ));
    }
    Ok(())
}

/// Ask `frontend` what to convert, what to merge, in which order and where to
///
/// Conversion is offered only when `env` has a converter. Existing PDFs are
/// gathered from the source directory and the converted-PDF directory;
/// a PDF that a selected conversion is about to regenerate is offered once,
/// as the conversion. Returns `None` when the user picks nothing at all.
pub fn plan_run<F: Frontend + ?Sized>(
    frontend: &mut F,
    layout: &Layout,
    env: &ConverterEnv,
) -> Result<Option<RunRequest>> {
    let selection = if env.is_available() {
        let candidates = find_convertible(&layout.source_dir)?;
        if candidates.is_empty() {
            Vec::new()
        } else {
            let labels: Vec<String> = candidates.iter().map(|d| d.display_name()).collect();
            let picked = frontend.select_files("Select files to convert to PDF", &labels)?;
            picked
                .into_iter()
                .filter_map(|i| candidates.get(i).cloned())
                .collect::<Vec<SourceDocument>>()
        }
    } else {
        Vec::new()
    };

    let names = pdf_names(&selection);
    let planned: HashSet<PathBuf> = names
        .iter()
        .map(|name| layout.converted_dir.join(name))
        .collect();

    let mut pool: Vec<(MergeSource, String)> = selection
        .iter()
        .zip(&names)
        .map(|(d, name)| {
            let label = format!("{} (from {})", name.to_string_lossy(), d.display_name());
            (MergeSource::converted(d), label)
        })
        .collect();

    let mut seen = planned;
    let mut existing = find_pdfs(&layout.source_dir)?;
    existing.extend(find_pdfs(&layout.converted_dir)?);
    for path in existing {
        if seen.insert(path.clone()) {
            let label = pdf_label(layout, &path);
            pool.push((MergeSource::existing(path), label));
        }
    }
    debug!("{} merge candidates", pool.len());

    if pool.is_empty() {
        return Ok(None);
    }

    let labels: Vec<String> = pool.iter().map(|(_, label)| label.clone()).collect();
    let picked: Vec<usize> = frontend
        .select_files("Select PDF files to merge", &labels)?
        .into_iter()
        .filter(|&i| i < pool.len())
        .collect();

    if picked.is_empty() {
        if selection.is_empty() {
            return Ok(None);
        }
        return Ok(Some(RunRequest {
            selection,
            ..RunRequest::default()
        }));
    }

    let chosen: Vec<(MergeSource, String)> = picked.into_iter().map(|i| pool[i].clone()).collect();
    let order = if chosen.len() > 1 {
        let labels: Vec<String> = chosen.iter().map(|(_, label)| label.clone()).collect();
        let order = frontend.order_files(&labels)?;
        check_order(&order, chosen.len())?;
        order.into_iter().map(|i| chosen[i].0.clone()).collect()
    } else {
        chosen.into_iter().map(|(source, _)| source).collect()
    };

    let default_name = layout.default_output_name();
    let (output_path, overwrite) = loop {
        let name = normalize_output_name(&frontend.output_filename(&default_name)?)?;
        let path = layout.output_path(&name);
        if !path.exists() {
            break (path, false);
        }
        let prompt = format!("{} already exists. Overwrite it?", path.display());
        if frontend.confirm(&prompt, false)? {
            break (path, true);
        }
    };

    Ok(Some(RunRequest {
        selection,
        order,
        output_path: Some(output_path),
        overwrite,
    }))
}
