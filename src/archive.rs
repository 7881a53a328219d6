//! Reading and writing gzip-compressed notebook archives

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

/// Decompress a notebook archive and return its document text
///
/// Fails with [`Error::CorruptArchive`] when the file is not valid gzip or
/// the payload is not UTF-8.
pub fn decompress(archive_path: &Path) -> Result<String> {
    if !archive_path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", archive_path.display()),
        )));
    }

    let file = File::open(archive_path)?;
    let mut decoder = MultiGzDecoder::new(BufReader::new(file));
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|source| Error::CorruptArchive {
            path: archive_path.to_path_buf(),
            source,
        })?;

    Ok(text)
}

/// Compress document text into a notebook archive, overwriting `dest`
pub fn compress(document_text: &str, dest: &Path) -> Result<()> {
    let file = File::create(dest)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    encoder.write_all(document_text.as_bytes())?;

    // finish() writes the gzip trailer; the BufWriter must be flushed after it
    let mut writer = encoder.finish()?;
    writer.flush()?;

    Ok(())
}
