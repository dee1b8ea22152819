//! PDF manipulation module

pub mod merge;
pub mod metadata;

// Re-export commonly used items
pub use merge::{merge_pdfs, MergeEntry, MergeOptions, MergedOutput};
pub use metadata::{count_pages, page_count};
