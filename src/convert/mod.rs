//! Office document to PDF conversion through an external converter

pub mod invoke;
pub mod tool;

// Re-export commonly used items
pub use invoke::{convert, ConversionJob, Converter};
pub use tool::{ConverterEnv, CONVERTER_NAMES};
