//! Office PDF Merge Library
//!
//! Converts office documents (presentations, text documents, spreadsheets)
//! to PDF through an external LibreOffice converter and merges PDFs in a
//! user-chosen order. This library provides functionality to:
//! - Discover convertible documents and existing PDFs in a directory
//! - Run the converter with a timeout, one document at a time
//! - Merge multiple PDF files without leaving partial output behind
//! - Drive a whole run from a pluggable front end and report the outcome
//!
//! # Example
//!
//! ```no_run
//! use office_pdf_merge::config::{ConvertOptions, Layout};
//! use office_pdf_merge::convert::{Converter, ConverterEnv};
//! use office_pdf_merge::document::SourceDocument;
//! use office_pdf_merge::pipeline::{MergeSource, Pipeline, RunRequest};
//!
//! let layout = Layout::new("slides");
//! let converter = Converter::new(&ConverterEnv::detect(), ConvertOptions::default())?;
//! let deck = SourceDocument::from_path("slides/intro.pptx")?;
//!
//! let request = RunRequest {
//!     selection: vec![deck.clone()],
//!     order: vec![
//!         MergeSource::existing("slides/cover.pdf"),
//!         MergeSource::converted(&deck),
//!     ],
//!     output_path: Some(layout.output_path("handout.pdf")),
//!     overwrite: false,
//! };
//!
//! let report = Pipeline::with_converter(Some(converter), &layout.converted_dir).run(&request)?;
//! println!("{}", report.summary());
//! # Ok::<(), office_pdf_merge::Error>(())
//! ```

pub mod cancel;
pub mod config;
pub mod convert;
pub mod discover;
pub mod document;
pub mod error;
pub mod pdf;
pub mod pipeline;

// Re-export commonly used items
pub use error::{Error, Result};
