use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Result, XpackError};

use super::EntryCompression;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Files at or above this size need ZIP64 extra fields.
const ZIP64_THRESHOLD: u64 = 0xFFFF_FFFF;

/// Exclusive owner of the destination ZIP for the duration of one run.
///
/// `finish` writes the central directory. If the writer is dropped without
/// `finish` (e.g. during unwinding) the inner `ZipWriter` still finalizes.
pub(super) struct ArchiveWriter {
    path: PathBuf,
    zip: ZipWriter<BufWriter<File>>,
    method: CompressionMethod,
}

impl ArchiveWriter {
    pub(super) fn create(path: &Path, compression: EntryCompression) -> Result<Self> {
        let file = File::create(path).map_err(|source| XpackError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        let method = match compression {
            EntryCompression::Stored => CompressionMethod::Stored,
            EntryCompression::Deflate => CompressionMethod::Deflated,
        };
        Ok(Self {
            path: path.to_path_buf(),
            zip: ZipWriter::new(BufWriter::new(file)),
            method,
        })
    }

    /// Stream `source_path` into a new entry named `name`. Returns bytes copied.
    ///
    /// The source is opened before the entry is started, so a file that
    /// cannot be opened leaves no trace in the archive. A failure after the
    /// entry was started removes the partial entry again.
    pub(super) fn add_file(
        &mut self,
        name: &str,
        source_path: &Path,
        size_hint: u64,
        mode: Option<u32>,
    ) -> Result<u64> {
        let mut reader = File::open(source_path).map_err(|source| XpackError::Read {
            path: source_path.to_path_buf(),
            source,
        })?;

        let mut options = SimpleFileOptions::default()
            .compression_method(self.method)
            .large_file(size_hint >= ZIP64_THRESHOLD);
        if let Some(mode) = mode {
            options = options.unix_permissions(mode);
        }

        self.zip
            .start_file(name, options)
            .map_err(|source| XpackError::Write {
                entry: name.to_string(),
                source,
            })?;

        match self.copy_into_entry(name, source_path, &mut reader) {
            Ok(copied) => Ok(copied),
            Err(e) => {
                if let Err(abort_err) = self.zip.abort_file() {
                    warn!(entry = name, error = %abort_err, "failed to discard partial entry");
                }
                Err(e)
            }
        }
    }

    fn copy_into_entry(
        &mut self,
        name: &str,
        source_path: &Path,
        reader: &mut File,
    ) -> Result<u64> {
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut copied = 0u64;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(XpackError::Read {
                        path: source_path.to_path_buf(),
                        source,
                    })
                }
            };
            self.zip
                .write_all(&buf[..n])
                .map_err(|e| XpackError::Write {
                    entry: name.to_string(),
                    source: e.into(),
                })?;
            copied += n as u64;
        }
        Ok(copied)
    }

    /// Write the central directory and flush the underlying file.
    pub(super) fn finish(self) -> Result<()> {
        let path = self.path;
        let mut inner = self.zip.finish().map_err(|source| XpackError::Write {
            entry: "<central directory>".to_string(),
            source,
        })?;
        inner.flush().map_err(|e| XpackError::Write {
            entry: "<central directory>".to_string(),
            source: e.into(),
        })?;
        debug!(path = %path.display(), "archive finalized");
        Ok(())
    }
}
