//! Source notebooks and the page region carved out of them

use std::path::{Path, PathBuf};

use crate::archive;
use crate::background::{self, BackgroundRef};
use crate::error::{Error, Result};
use crate::markup;

/// One input notebook, decompressed
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Archive the document was read from
    pub path: PathBuf,
    /// Position in the merge order
    pub position: usize,
    /// Decompressed document body
    pub text: String,
    /// Resolved PDF background, if the document has one
    pub background: Option<PathBuf>,
}

impl SourceDocument {
    /// Decompress an archive and resolve its PDF background
    pub fn load(path: &Path, position: usize) -> Result<Self> {
        let text = archive::decompress(path)?;
        Self::from_text(path, position, text)
    }

    /// Build a document from already decompressed text
    pub fn from_text(path: &Path, position: usize, text: String) -> Result<Self> {
        let background = background::find_background(&text)
            .map(|bg| background::resolve_background(&bg, path))
            .transpose()?;

        Ok(Self {
            path: path.to_path_buf(),
            position,
            text,
            background,
        })
    }

    /// File name used in log lines and provenance comments
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Everything before the first page tag
    ///
    /// Ends exactly where [`page_block`](Self::page_block) starts, so nothing
    /// is lost when `<page` shares a line with the root element.
    pub fn header(&self) -> Result<&str> {
        let open = markup::find_start_tag(&self.text, "page", 0)
            .ok_or_else(|| Error::malformed(&self.path, "no <page> tag"))?;
        Ok(&self.text[..open.start])
    }

    /// Name of the root element, used to close the merged document
    pub fn root_element(&self) -> Result<&str> {
        markup::root_element_name(&self.text)
            .ok_or_else(|| Error::malformed(&self.path, "no root element"))
    }

    /// Fail unless the document has a root element and a closed page region
    pub fn check_structure(&self) -> Result<()> {
        self.root_element()?;
        self.page_block().map(|_| ())
    }

    /// Extract the page region, from the first `<page` to the last `</page>`
    pub fn page_block(&self) -> Result<PageBlock> {
        let open = markup::find_start_tag(&self.text, "page", 0)
            .ok_or_else(|| Error::malformed(&self.path, "no <page> tag"))?;
        let close = markup::find_last_end_tag(&self.text, "page")
            .filter(|close| close.start >= open.end)
            .ok_or_else(|| Error::malformed(&self.path, "no </page> after <page>"))?;

        Ok(PageBlock {
            text: self.text[open.start..close.end].to_string(),
        })
    }
}

/// The page region of a document, page tags included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBlock {
    text: String,
}

impl PageBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// PDF background declarations in document order
    pub fn pdf_backgrounds(&self) -> Vec<BackgroundRef> {
        let mut found = Vec::new();
        let mut cursor = 0;
        while let Some(bg) = background::next_pdf_background(&self.text, cursor) {
            cursor = bg.span.end;
            found.push(bg);
        }
        found
    }

    /// Replace each declaration's span with the tag produced by `rewrite`
    ///
    /// Text outside the declarations, indentation included, is kept as is.
    pub fn rewrite_backgrounds<F>(&mut self, mut rewrite: F) -> Result<()>
    where
        F: FnMut(&BackgroundRef) -> Result<String>,
    {
        let mut out = String::with_capacity(self.text.len());
        let mut last = 0;
        for bg in self.pdf_backgrounds() {
            out.push_str(&self.text[last..bg.span.start]);
            out.push_str(&rewrite(&bg)?);
            last = bg.span.end;
        }
        out.push_str(&self.text[last..]);
        self.text = out;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<?xml version=\"1.0\" standalone=\"no\"?>\n\
<xournal creator=\"Xournal++ 1.2.2\" fileversion=\"4\">\n\
<title>Xournal++ document</title>\n\
<preview>aGVsbG8=</preview>\n\
<page width=\"595.27\" height=\"841.89\">\n\
<background type=\"solid\" color=\"#ffffffff\" style=\"lined\"/>\n\
<layer>\n\
<stroke tool=\"pen\" color=\"#000000ff\" width=\"1.41\">10 10 20 20</stroke>\n\
</layer>\n\
</page>\n\
</xournal>\n";

    fn doc(text: &str) -> SourceDocument {
        SourceDocument::from_text(Path::new("1.xopp"), 0, text.to_string())
            .expect("Failed to build document")
    }

    #[test]
    fn test_header_stops_before_page_tag() {
        let d = doc(DOC);
        let header = d.header().unwrap();
        assert!(header.ends_with("<preview>aGVsbG8=</preview>\n"));
        assert!(!header.contains("<page"));
        // <preview> must not be mistaken for a page tag
        assert!(header.contains("<xournal"));
    }

    #[test]
    fn test_single_line_document_keeps_header() {
        let text = "<?xml version=\"1.0\"?><xournal creator=\"x\"><title>t</title>\
<page width=\"1\"><layer/></page></xournal>";
        let d = doc(text);
        let header = d.header().unwrap();
        assert_eq!(header, "<?xml version=\"1.0\"?><xournal creator=\"x\"><title>t</title>");

        let block = d.page_block().unwrap();
        assert_eq!(format!("{}{}</xournal>", header, block.as_str()), text);
    }

    #[test]
    fn test_page_block_is_inclusive() {
        let block = doc(DOC).page_block().unwrap();
        assert!(block.as_str().starts_with("<page width="));
        assert!(block.as_str().ends_with("</page>"));
        assert!(block.as_str().contains("<stroke"));
    }

    #[test]
    fn test_root_element() {
        assert_eq!(doc(DOC).root_element().unwrap(), "xournal");
    }

    #[test]
    fn test_missing_page_is_malformed() {
        let d = doc("<xournal>\n<title>x</title>\n</xournal>\n");
        assert!(matches!(d.header(), Err(Error::MalformedDocument { .. })));
        assert!(matches!(d.page_block(), Err(Error::MalformedDocument { .. })));
    }

    #[test]
    fn test_unclosed_page_is_malformed() {
        let d = doc("<xournal>\n<page width=\"1\">\n<layer/>\n</xournal>\n");
        assert!(matches!(d.page_block(), Err(Error::MalformedDocument { .. })));
        assert!(matches!(d.check_structure(), Err(Error::MalformedDocument { .. })));
        assert!(doc(DOC).check_structure().is_ok());
    }

    #[test]
    fn test_rewrite_keeps_surrounding_text() {
        let mut block = PageBlock::new(
            "<page>\n  <background type=\"pdf\" pageno=\"1\"/>\n<layer/>\n</page>",
        );
        block
            .rewrite_backgrounds(|_| Ok("<background type=\"pdf\" pageno=\"9\"/>".to_string()))
            .unwrap();
        assert_eq!(
            block.as_str(),
            "<page>\n  <background type=\"pdf\" pageno=\"9\"/>\n<layer/>\n</page>"
        );
    }

    #[test]
    fn test_document_without_background() {
        assert!(doc(DOC).background.is_none());
    }
}
