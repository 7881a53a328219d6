//! Error types for the notebook merger

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the notebook merger
#[derive(Error, Debug)]
pub enum Error {
    /// The input directory does not exist
    #[error("Input directory not found: {}", .0.display())]
    InputDirNotFound(PathBuf),

    /// The input directory holds no notebook archives
    #[error("No notebook archives found in {}", .0.display())]
    NoInputFound(PathBuf),

    /// A document references a PDF background that is not on disk
    #[error("PDF background {} referenced by {} not found", .pdf.display(), .document.display())]
    MissingBackground { document: PathBuf, pdf: PathBuf },

    /// An archive could not be decompressed
    #[error("Cannot decompress archive {}: {source}", .path.display())]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A background PDF could not be opened or has no usable page tree
    #[error("Cannot read PDF {}: {reason}", .path.display())]
    UnreadablePdf { path: PathBuf, reason: String },

    /// A document body lacks the expected page markers or attributes
    #[error("Malformed document {}: {reason}", .document.display())]
    MalformedDocument { document: PathBuf, reason: String },

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error aborts the merge.
    ///
    /// An empty input directory is reported but is not a failure.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::NoInputFound(_))
    }

    pub(crate) fn malformed(document: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::MalformedDocument {
            document: document.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unreadable_pdf(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::UnreadablePdf {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_input_is_not_fatal() {
        assert!(!Error::NoInputFound(PathBuf::from("notes")).is_fatal());
        assert!(Error::malformed("a.xopp", "no page").is_fatal());
    }

    #[test]
    fn test_messages_name_the_file() {
        let err = Error::MissingBackground {
            document: PathBuf::from("2.xopp"),
            pdf: PathBuf::from("/tmp/slides.pdf"),
        };
        let msg = err.to_string();
        assert!(msg.contains("2.xopp"));
        assert!(msg.contains("/tmp/slides.pdf"));
    }
}
