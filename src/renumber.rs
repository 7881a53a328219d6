//! Rewriting page background references to point into the merged PDF

use std::path::{Path, PathBuf};

use crate::background::BackgroundRef;
use crate::document::PageBlock;
use crate::error::{Error, Result};
use crate::markup;

/// Renumbers PDF background references across the whole merge
///
/// The first PDF background of the merge is the only one that names the
/// merged PDF; every later one carries just a page number and relies on the
/// reader sharing that single background stream.
#[derive(Debug, Clone)]
pub struct PageRenumberer {
    merged_pdf: PathBuf,
    first_pending: bool,
}

impl PageRenumberer {
    pub fn new(merged_pdf: impl Into<PathBuf>) -> Self {
        Self {
            merged_pdf: merged_pdf.into(),
            first_pending: true,
        }
    }

    /// Whether no PDF background has been rewritten yet
    pub fn first_pending(&self) -> bool {
        self.first_pending
    }

    /// Rewrite every PDF background in `block`
    ///
    /// `offset` is the number of merged-PDF pages contributed by the documents
    /// before this one. Blocks without a PDF background come back unchanged.
    pub fn renumber(&mut self, mut block: PageBlock, offset: usize, document: &Path) -> Result<PageBlock> {
        block.rewrite_backgrounds(|bg| {
            if self.first_pending {
                self.first_pending = false;
                Ok(first_background_tag(&self.merged_pdf))
            } else {
                let page = source_page_number(bg, document)?;
                Ok(background_tag(page + offset))
            }
        })?;
        Ok(block)
    }
}

fn source_page_number(bg: &BackgroundRef, document: &Path) -> Result<usize> {
    bg.page_number().ok_or_else(|| {
        Error::malformed(
            document,
            format!(
                "PDF background has no valid pageno (found {:?})",
                bg.pageno.as_deref().unwrap_or("")
            ),
        )
    })
}

/// Declaration that attaches the merged PDF, at its first page
pub fn first_background_tag(merged_pdf: &Path) -> String {
    format!(
        "<background type=\"pdf\" domain=\"absolute\" filename=\"{}\" pageno=\"1\"/>",
        markup::escape_attr(&merged_pdf.to_string_lossy())
    )
}

/// Declaration for a later page of the already attached PDF
pub fn background_tag(page: usize) -> String {
    format!("<background type=\"pdf\" pageno=\"{}\"/>", page)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_page(filename: &str, pageno: &str) -> PageBlock {
        PageBlock::new(format!(
            "<page width=\"595\" height=\"842\">\n\
<background type=\"pdf\" domain=\"absolute\" filename=\"{}\" pageno=\"{}\"/>\n\
<layer/>\n\
</page>",
            filename, pageno
        ))
    }

    #[test]
    fn test_block_without_pdf_is_unchanged() {
        let mut renumberer = PageRenumberer::new("/out/merged.pdf");
        let block = PageBlock::new("<page>\n<background type=\"solid\"/>\n<layer/>\n</page>");

        let out = renumberer
            .renumber(block.clone(), 5, Path::new("a.xopp"))
            .unwrap();
        assert_eq!(out, block);
        assert!(renumberer.first_pending());
    }

    #[test]
    fn test_first_background_names_merged_pdf() {
        let mut renumberer = PageRenumberer::new("/out/merged.pdf");
        let out = renumberer
            .renumber(pdf_page("/in/x.pdf", "2"), 0, Path::new("b.xopp"))
            .unwrap();

        assert!(out.as_str().contains(
            "<background type=\"pdf\" domain=\"absolute\" filename=\"/out/merged.pdf\" pageno=\"1\"/>"
        ));
        assert!(!out.as_str().contains("/in/x.pdf"));
        assert!(!renumberer.first_pending());
    }

    #[test]
    fn test_later_backgrounds_are_offset() {
        let mut renumberer = PageRenumberer::new("/out/merged.pdf");
        renumberer
            .renumber(pdf_page("/in/x.pdf", "2"), 0, Path::new("b.xopp"))
            .unwrap();

        let out = renumberer
            .renumber(pdf_page("/in/y.pdf", "1"), 3, Path::new("c.xopp"))
            .unwrap();
        assert!(out.as_str().contains("<background type=\"pdf\" pageno=\"4\"/>"));
        assert!(!out.as_str().contains("filename="));
    }

    #[test]
    fn test_pageno_suffix_is_ignored() {
        let mut renumberer = PageRenumberer::new("/out/merged.pdf");
        renumberer
            .renumber(pdf_page("/in/x.pdf", "1"), 0, Path::new("a.xopp"))
            .unwrap();

        let out = renumberer
            .renumber(pdf_page("/in/y.pdf", "3ll"), 10, Path::new("b.xopp"))
            .unwrap();
        assert!(out.as_str().contains("pageno=\"13\""));
    }

    #[test]
    fn test_several_pages_in_one_block() {
        let mut renumberer = PageRenumberer::new("/out/merged.pdf");
        let block = PageBlock::new(
            "<page>\n<background type=\"pdf\" domain=\"absolute\" filename=\"/in/x.pdf\" pageno=\"1\"/>\n</page>\n\
<page>\n<background type=\"pdf\" pageno=\"2\"/>\n</page>",
        );

        let out = renumberer.renumber(block, 0, Path::new("a.xopp")).unwrap();
        assert_eq!(out.as_str().matches("filename=").count(), 1);
        assert!(out.as_str().contains("<background type=\"pdf\" pageno=\"2\"/>"));
    }

    #[test]
    fn test_invalid_pageno_is_malformed() {
        let mut renumberer = PageRenumberer::new("/out/merged.pdf");
        renumberer
            .renumber(pdf_page("/in/x.pdf", "1"), 0, Path::new("a.xopp"))
            .unwrap();

        let result = renumberer.renumber(pdf_page("/in/y.pdf", "zero"), 1, Path::new("b.xopp"));
        assert!(matches!(result, Err(Error::MalformedDocument { .. })));
    }

    #[test]
    fn test_merged_path_is_escaped() {
        let tag = first_background_tag(Path::new("/out/Q&A.pdf"));
        assert!(tag.contains("filename=\"/out/Q&amp;A.pdf\""));
    }
}
