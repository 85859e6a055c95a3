//! Metadata extraction.
//!
//! A [`MetadataExtractor`] turns one file path into a [`MetadataRecord`]: a flat map of
//! exiftool-style field names (`FileType`, `DateTimeOriginal`, ...) to string values.
//! Two backends ship with the crate:
//!
//! - [`NativeExtractor`] — pure Rust, built on nom-exif. No external tools needed.
//! - [`ExifToolExtractor`] — drives a single long-lived `exiftool` process. Reads
//!   every field exiftool knows about, including QuickTime `CreationDate` and
//!   `SubSecDateTimeOriginal`.
//!
//! Use [`build_extractor`] to construct the backend selected in the config.

mod exiftool;
mod reader;

pub use exiftool::ExifToolExtractor;
pub use reader::{NativeExtractor, sniff_file_type};

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::{ExtractorBackend, ExtractorConfig};
use crate::error::StartupError;

/// Field holding the container type tag reported by the reader.
pub const FILE_TYPE_FIELD: &str = "FileType";

/// Metadata read from one file.
///
/// `error` carries a per-file failure reported by the reader itself (e.g. exiftool's
/// `Error` field for a truncated file). When it is set the fields should not be trusted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRecord {
    fields: HashMap<String, String>,
    error: Option<String>,
}

impl MetadataRecord {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self {
            fields,
            error: None,
        }
    }

    /// A record for a file the reader could not make sense of.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            fields: HashMap::new(),
            error: Some(error.into()),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn file_type(&self) -> Option<&str> {
        self.get(FILE_TYPE_FIELD)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MetadataRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Trait for metadata readers.
///
/// Implementations are shared by every pipeline worker through an `Arc`, so they must be
/// safe to call concurrently. A backend that wraps a single-threaded resource should
/// serialise access internally (see [`ExifToolExtractor`]).
///
/// An `Err` means the file could not be read at all (I/O, broken pipe to a helper
/// process). Problems the reader can attribute to the file's content are reported
/// through [`MetadataRecord::failed`] instead.
#[async_trait::async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// The display name of this backend (e.g. "native", "exiftool").
    fn name(&self) -> &str;

    /// Read the metadata of exactly one file.
    async fn extract(&self, path: &Path) -> Result<MetadataRecord>;
}

/// Build the metadata backend selected by the configuration.
///
/// Starting exiftool is the expensive part of a run, so this is called once and the
/// result is handed to every worker.
pub async fn build_extractor(
    config: &ExtractorConfig,
) -> Result<Arc<dyn MetadataExtractor>, StartupError> {
    match config.backend {
        ExtractorBackend::Native => Ok(Arc::new(NativeExtractor::new())),
        ExtractorBackend::ExifTool => {
            let extractor = ExifToolExtractor::spawn(&config.exiftool_path)
                .await
                .map_err(|e| StartupError::Extractor(format!("{e:#}")))?;
            Ok(Arc::new(extractor))
        }
    }
}
