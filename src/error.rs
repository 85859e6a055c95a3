//! Error kinds raised while renaming a library.
//!
//! Two families exist and they never mix:
//!
//! - [`RenameError`] is attached to a single file. It is recorded in the run report and
//!   the batch moves on to the next file.
//! - [`StartupError`] stops the run before the first file is touched.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A failure that affects exactly one file.
#[derive(Debug, Error)]
pub enum RenameError {
    /// The metadata reader could not read the file.
    #[error("failed to read metadata: {0}")]
    Extraction(String),

    /// The file type is not one we know how to name.
    #[error("not a supported type: {0}")]
    UnsupportedType(String),

    /// None of the capture-time fields were present.
    #[error("no capture timestamp found")]
    TimestampNotFound,

    /// A capture-time field was present but matched no known format.
    #[error("unrecognised timestamp {0:?}")]
    TimestampUnparseable(String),

    /// Every sequence index for this second is taken.
    #[error("no free name for {base}.{extension} after {limit} attempts")]
    AllocationExhausted {
        base: String,
        extension: String,
        limit: u32,
    },

    /// The filesystem refused the rename.
    #[error("failed to rename to {}: {source}", .target.display())]
    Rename {
        target: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RenameError {
    /// Short machine-friendly label, used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Extraction(_) => "extraction_failure",
            Self::UnsupportedType(_) => "unsupported_type",
            Self::TimestampNotFound => "timestamp_not_found",
            Self::TimestampUnparseable(_) => "timestamp_unparseable",
            Self::AllocationExhausted { .. } => "allocation_exhausted",
            Self::Rename { .. } => "rename_failure",
        }
    }
}

/// Errors that abort the run before any file is processed.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("directory {} does not exist", .0.display())]
    MissingRoot(PathBuf),

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// The metadata reader could not be initialised (e.g. exiftool missing).
    #[error("failed to start metadata reader: {0}")]
    Extractor(String),
}

/// A per-file failure, tagged with the file it belongs to.
#[derive(Debug)]
pub struct FileError {
    pub path: PathBuf,
    pub error: RenameError,
}

impl FileError {
    pub fn new(path: impl Into<PathBuf>, error: RenameError) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }

    /// The file's base name, as shown in the end-of-run report.
    pub fn name(&self) -> String {
        file_name(&self.path)
    }
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name(), self.error)
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
