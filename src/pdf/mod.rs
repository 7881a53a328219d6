//! PDF background handling

pub mod merge;

// Re-export commonly used items
pub use merge::{merge_pdfs, MergedPdf};
