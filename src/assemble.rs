//! Splicing source notebooks into one merged notebook

use std::path::Path;

use log::debug;

use crate::document::SourceDocument;
use crate::error::{Error, Result};
use crate::renumber::PageRenumberer;

/// Builds the merged document text one source document at a time
///
/// The header and root element come from the first document. Each appended
/// document with a PDF background advances the running page offset by the
/// page count its PDF contributed to the merged PDF.
#[derive(Debug)]
pub struct DocumentAssembler {
    output: String,
    root: String,
    renumberer: PageRenumberer,
    offset: usize,
}

impl DocumentAssembler {
    /// Start a merged document with the header of `first`
    ///
    /// `merged_pdf` is the path stored in the first PDF background.
    pub fn new(first: &SourceDocument, merged_pdf: &Path) -> Result<Self> {
        let header = first.header()?;
        let root = first.root_element()?.to_string();

        Ok(Self {
            output: header.to_string(),
            root,
            renumberer: PageRenumberer::new(merged_pdf),
            offset: 0,
        })
    }

    /// Pages of the merged PDF taken by the documents appended so far
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Append the page region of `document`
    ///
    /// `background_pages` is the number of pages the document's PDF added to
    /// the merged PDF; it must be `Some` exactly when the document has a PDF
    /// background.
    pub fn append(&mut self, document: &SourceDocument, background_pages: Option<usize>) -> Result<()> {
        if document.background.is_some() != background_pages.is_some() {
            return Err(Error::malformed(
                &document.path,
                "PDF background does not match the merged PDF sources",
            ));
        }

        let block = document.page_block()?;
        let block = self.renumberer.renumber(block, self.offset, &document.path)?;

        self.output.push_str(&format!(
            "<!-- content from {} -->\n",
            comment_safe(&document.name())
        ));
        self.output.push_str(block.as_str());
        self.output.push('\n');
        debug!(
            "Appended page content of {} (#{}) at background offset {}",
            document.name(),
            document.position + 1,
            self.offset
        );

        if let Some(pages) = background_pages {
            self.offset += pages;
        }

        Ok(())
    }

    /// Close the root element and return the finished text
    pub fn finish(mut self) -> String {
        self.output.push_str(&format!("</{}>\n", self.root));
        self.output
    }
}

/// XML comments may not contain `--`
fn comment_safe(text: &str) -> String {
    let mut safe = text.to_string();
    while safe.contains("--") {
        safe = safe.replace("--", "-");
    }
    safe
}

/// Assemble `documents`, in the given order, into one document text
///
/// `background_pages[i]` is the merged-PDF page count of `documents[i]`'s
/// background, or `None` for a document without a PDF background.
pub fn assemble(
    documents: &[SourceDocument],
    background_pages: &[Option<usize>],
    merged_pdf: &Path,
) -> Result<String> {
    let first = documents
        .first()
        .ok_or_else(|| Error::malformed(merged_pdf, "nothing to assemble"))?;
    if documents.len() != background_pages.len() {
        return Err(Error::malformed(
            &first.path,
            "background page counts do not cover every document",
        ));
    }

    let mut assembler = DocumentAssembler::new(first, merged_pdf)?;
    for (document, &pages) in documents.iter().zip(background_pages) {
        assembler.append(document, pages)?;
    }

    Ok(assembler.finish())
}
