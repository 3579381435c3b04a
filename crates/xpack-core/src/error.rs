use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, XpackError>;

#[derive(Debug, Error)]
pub enum XpackError {
    #[error("source directory not found: '{}'", .0.display())]
    SourceNotFound(PathBuf),

    #[error("source is not a directory: '{}'", .0.display())]
    SourceNotDirectory(PathBuf),

    #[error("cannot create archive '{}': {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write archive entry '{entry}': {source}")]
    Write {
        entry: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("operation interrupted")]
    Interrupted,

    #[error("timed out waiting for removable media at '{}'", .0.display())]
    MediaTimeout(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("log image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl XpackError {
    /// The source root was missing or unusable before any work started.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            XpackError::SourceNotFound(_) | XpackError::SourceNotDirectory(_)
        )
    }

    /// A failure while reading the source tree or writing the archive.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            XpackError::Read { .. } | XpackError::Write { .. } | XpackError::Io(_)
        )
    }
}
