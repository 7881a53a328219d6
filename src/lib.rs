//! Xournal++ notebook merger
//!
//! Merges a directory of notebook archives (`.xopp`, gzip-compressed XML)
//! into a single notebook. This library provides functionality to:
//! - Find archives and order them naturally (`2.xopp` before `10.xopp`)
//! - Concatenate every PDF background into one merged PDF
//! - Renumber each page's background reference into the merged PDF
//! - Write the merged notebook, all-or-nothing
//!
//! # Example
//!
//! ```no_run
//! use xopp_merge::{merge_notebooks, MergeOptions};
//! use std::path::PathBuf;
//!
//! let options = MergeOptions {
//!     input_dir: PathBuf::from("lectures"),
//!     output_dir: PathBuf::from("lectures/merged"),
//!     ..MergeOptions::default()
//! };
//!
//! let report = merge_notebooks(&options).expect("Failed to merge notebooks");
//! println!("Wrote {}", report.archive.display());
//! ```

pub mod archive;
pub mod assemble;
pub mod background;
pub mod document;
pub mod error;
pub mod input;
pub mod markup;
pub mod pdf;
pub mod renumber;

use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::document::SourceDocument;

// Re-export commonly used items
pub use error::{Error, Result};

/// Options for a merge run
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Directory holding the notebook archives
    pub input_dir: PathBuf,
    /// Directory receiving the merged archive and merged PDF
    pub output_dir: PathBuf,
    /// File name of the merged archive
    pub archive_name: String,
    /// File name of the merged PDF background
    pub pdf_name: String,
    /// Extension of the input archives, without the dot
    pub extension: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("output-xopp-merger"),
            archive_name: "merged_output.xopp".to_string(),
            pdf_name: "merged_background.pdf".to_string(),
            extension: "xopp".to_string(),
        }
    }
}

/// Outcome of a successful merge
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// Input archives in merge order
    pub inputs: Vec<PathBuf>,
    /// Background pages each input contributed, `None` without a PDF background
    pub background_pages: Vec<Option<usize>>,
    /// The merged notebook
    pub archive: PathBuf,
    /// The merged PDF, if any input had a PDF background
    pub merged_pdf: Option<PathBuf>,
}

impl MergeReport {
    /// Total pages in the merged PDF
    pub fn total_pdf_pages(&self) -> usize {
        self.background_pages.iter().flatten().sum()
    }
}

/// Merge every archive in `options.input_dir` into one notebook
///
/// Every archive is decompressed and checked, and its background resolved,
/// before the output directory is touched. The merged PDF and archive are
/// staged in a temporary directory inside the output directory and only
/// moved into place once everything succeeded. On error nothing is left in
/// the output directory, and an output directory created by this run is
/// removed again.
pub fn merge_notebooks(options: &MergeOptions) -> Result<MergeReport> {
    let inputs = discover_inputs(options)?;
    info!("Found {} notebook archives", inputs.len());

    let documents = inputs
        .iter()
        .enumerate()
        .map(|(position, path)| -> Result<SourceDocument> {
            let doc = SourceDocument::load(path, position)?;
            doc.check_structure()?;
            debug!("Decompressed {}", doc.name());
            if let Some(bg) = &doc.background {
                debug!("{} uses PDF background {}", doc.name(), bg.display());
            }
            Ok(doc)
        })
        .collect::<Result<Vec<_>>>()?;

    let created = !options.output_dir.exists();
    fs::create_dir_all(&options.output_dir)?;

    let result = write_merged(options, &documents);
    if result.is_err() && created {
        let _ = fs::remove_dir(&options.output_dir);
    }
    result
}

/// Stage the merged PDF and archive, then move both into the output directory
fn write_merged(options: &MergeOptions, documents: &[SourceDocument]) -> Result<MergeReport> {
    let output_dir = options.output_dir.canonicalize()?;
    let final_pdf = output_dir.join(&options.pdf_name);
    let final_archive = output_dir.join(&options.archive_name);

    // Removed on drop, whichever way this function returns
    let staging = tempfile::Builder::new()
        .prefix(".tmp-xopp-merger")
        .tempdir_in(&output_dir)?;
    debug!("Staging output in {}", staging.path().display());

    let pdf_sources: Vec<PathBuf> = documents
        .iter()
        .filter_map(|doc| doc.background.clone())
        .collect();
    let merged = pdf::merge_pdfs(&pdf_sources, &staging.path().join(&options.pdf_name))?;
    let background_pages = background_pages_per_document(documents, merged.as_ref());
    if let Some(merged) = &merged {
        info!(
            "Merged {} PDF backgrounds into {} pages",
            merged.page_counts.len(),
            merged.total_pages()
        );
    }

    let text = assemble::assemble(documents, &background_pages, &final_pdf)?;
    let staged_archive = staging.path().join(&options.archive_name);
    archive::compress(&text, &staged_archive)?;

    let merged_pdf = match merged {
        Some(merged) => {
            fs::rename(&merged.path, &final_pdf)?;
            Some(final_pdf)
        }
        None => None,
    };
    if let Err(e) = fs::rename(&staged_archive, &final_archive) {
        if let Some(pdf) = &merged_pdf {
            let _ = fs::remove_file(pdf);
        }
        return Err(e.into());
    }
    info!("Generated {}", final_archive.display());

    Ok(MergeReport {
        inputs: documents.iter().map(|doc| doc.path.clone()).collect(),
        background_pages,
        archive: final_archive,
        merged_pdf,
    })
}

/// Find the inputs, leaving out a previous merge result in the same directory
fn discover_inputs(options: &MergeOptions) -> Result<Vec<PathBuf>> {
    let found = input::find_archives(&options.input_dir, &options.extension)?;

    let previous_output = options
        .output_dir
        .canonicalize()
        .ok()
        .map(|dir| dir.join(&options.archive_name));

    let inputs: Vec<PathBuf> = found
        .into_iter()
        .filter(|path| {
            let is_previous = previous_output.is_some() && path.canonicalize().ok() == previous_output;
            if is_previous {
                warn!("Ignoring previous merge output {}", path.display());
            }
            !is_previous
        })
        .collect();

    if inputs.is_empty() {
        return Err(Error::NoInputFound(options.input_dir.clone()));
    }
    Ok(inputs)
}

/// Pair each document with the page count its PDF contributed
///
/// PDF sources were collected in document order, so the counts are handed
/// out in that same order.
fn background_pages_per_document(
    documents: &[SourceDocument],
    merged: Option<&pdf::MergedPdf>,
) -> Vec<Option<usize>> {
    let mut counts = merged
        .map(|m| m.page_counts.as_slice())
        .unwrap_or_default()
        .iter()
        .copied();

    documents
        .iter()
        .map(|doc| doc.background.as_ref().and_then(|_| counts.next()))
        .collect()
}
