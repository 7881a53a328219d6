//! PDF background declarations inside a notebook page

use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::markup;

/// A `<background type="pdf" .../>` declaration found in document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundRef {
    /// Byte range of the whole tag in the text it was found in
    pub span: Range<usize>,
    /// Unescaped `filename` attribute, if present
    pub filename: Option<String>,
    /// Raw `pageno` attribute, if present
    pub pageno: Option<String>,
}

impl BackgroundRef {
    /// Page number within the source PDF.
    ///
    /// Only the leading digits count, so a writer suffix like `3ll` reads as 3.
    pub fn page_number(&self) -> Option<usize> {
        let raw = self.pageno.as_deref()?;
        let digits_len = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
        raw[..digits_len].parse().ok().filter(|&n| n > 0)
    }
}

/// Find the next PDF background declaration at or after `from`
pub fn next_pdf_background(text: &str, from: usize) -> Option<BackgroundRef> {
    let mut cursor = from;
    while let Some(span) = markup::find_start_tag(text, "background", cursor) {
        let tag = &text[span.clone()];
        if markup::attr_value(tag, "type") == Some("pdf") {
            return Some(BackgroundRef {
                filename: markup::attr_value(tag, "filename").map(markup::unescape_attr),
                pageno: markup::attr_value(tag, "pageno").map(str::to_string),
                span,
            });
        }
        cursor = span.end;
    }
    None
}

/// Return the first PDF background declaration in a document, if any
pub fn find_background(document_text: &str) -> Option<BackgroundRef> {
    next_pdf_background(document_text, 0)
}

/// Resolve the PDF a document's background points at
///
/// Relative filenames are taken relative to the directory holding the
/// archive. The file must exist: a dangling reference is
/// [`Error::MissingBackground`], never a silently dropped background.
pub fn resolve_background(background: &BackgroundRef, archive_path: &Path) -> Result<PathBuf> {
    let filename = background.filename.as_deref().ok_or_else(|| {
        Error::malformed(archive_path, "PDF background declares no filename")
    })?;

    let candidate = Path::new(filename);
    let resolved = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        archive_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(candidate)
    };

    if !resolved.is_file() {
        return Err(Error::MissingBackground {
            document: archive_path.to_path_buf(),
            pdf: resolved,
        });
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAGE: &str = "<page width=\"595\" height=\"842\">\n\
<background type=\"solid\" color=\"#ffffffff\" style=\"plain\"/>\n\
<background type=\"pdf\" domain=\"absolute\" filename=\"/tmp/A &amp; B.pdf\" pageno=\"2ll\"/>\n\
<layer/>\n\
</page>\n";

    #[test]
    fn test_find_background_skips_non_pdf() {
        let bg = find_background(PAGE).expect("pdf background should be found");
        assert_eq!(bg.filename.as_deref(), Some("/tmp/A & B.pdf"));
        assert_eq!(bg.page_number(), Some(2));
        assert!(PAGE[bg.span.clone()].starts_with("<background type=\"pdf\""));
    }

    #[test]
    fn test_no_background() {
        let text = "<page>\n<background type=\"solid\"/>\n</page>";
        assert!(find_background(text).is_none());
    }

    #[test]
    fn test_page_number_rejects_zero_and_garbage() {
        let mut bg = find_background(PAGE).unwrap();
        bg.pageno = Some("0".to_string());
        assert_eq!(bg.page_number(), None);
        bg.pageno = Some("ll".to_string());
        assert_eq!(bg.page_number(), None);
        bg.pageno = None;
        assert_eq!(bg.page_number(), None);
    }

    #[test]
    fn test_resolve_relative_to_archive() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(dir.path().join("slides.pdf"), b"%PDF-1.5").unwrap();
        let archive = dir.path().join("1.xopp");

        let text = "<background type=\"pdf\" filename=\"slides.pdf\" pageno=\"1\"/>";
        let bg = find_background(text).unwrap();
        let resolved = resolve_background(&bg, &archive).expect("Failed to resolve");
        assert_eq!(resolved, dir.path().join("slides.pdf"));
    }

    #[test]
    fn test_resolve_missing_file() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let archive = dir.path().join("1.xopp");
        let text = "<background type=\"pdf\" filename=\"gone.pdf\" pageno=\"1\"/>";
        let bg = find_background(text).unwrap();

        let result = resolve_background(&bg, &archive);
        assert!(matches!(result, Err(Error::MissingBackground { .. })));
    }

    #[test]
    fn test_resolve_without_filename_is_malformed() {
        let text = "<background type=\"pdf\" pageno=\"1\"/>";
        let bg = find_background(text).unwrap();
        let result = resolve_background(&bg, Path::new("1.xopp"));
        assert!(matches!(result, Err(Error::MalformedDocument { .. })));
    }
}
