use anyhow::{Context, Result};
use nom_exif::*;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::{FILE_TYPE_FIELD, MetadataExtractor, MetadataRecord};

// Layout used by EXIF date tags.
const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
const EXIF_DATE_OFFSET_FORMAT: &str = "%Y:%m:%d %H:%M:%S%:z";

/// Number of leading bytes needed to identify every container we sniff.
const SNIFF_LEN: usize = 16;

/// Pure-Rust metadata reader backed by nom-exif.
///
/// The container type is sniffed from the file's magic bytes and reported as
/// `FileType` using exiftool's tags. Capture time is read from the EXIF
/// `DateTimeOriginal`/`CreateDate` tags for images and from the track header
/// `CreateDate` for MOV/MP4.
#[derive(Debug, Default)]
pub struct NativeExtractor;

impl NativeExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl MetadataExtractor for NativeExtractor {
    fn name(&self) -> &str {
        "native"
    }

    async fn extract(&self, path: &Path) -> Result<MetadataRecord> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || read_metadata(&path))
            .await
            .context("Metadata reader task panicked")?
    }
}

/// Read the metadata of one file synchronously.
fn read_metadata(path: &Path) -> Result<MetadataRecord> {
    let Some(file_type) = sniff_file_type(path)? else {
        return Ok(MetadataRecord::failed("unrecognised file format"));
    };

    let mut fields = HashMap::new();
    fields.insert(FILE_TYPE_FIELD.to_string(), file_type.to_string());

    // Only hand nom-exif the containers it understands; it does not read PNG.
    if matches!(file_type, "JPEG" | "HEIC" | "TIFF" | "MOV" | "MP4") {
        if let Err(reason) = read_dates(path, &mut fields) {
            log::debug!("Metadata of {} is unreadable: {reason}", path.display());
            return Ok(MetadataRecord::failed(reason));
        }
    }

    Ok(MetadataRecord::new(fields))
}

/// Collect capture-time tags into `fields`.
///
/// A container without an EXIF block, or without the date tags, is not an error: the
/// resolver decides what to do when nothing usable was found. A block that is present
/// but cannot be parsed is returned as `Err` with the reader's message.
fn read_dates(path: &Path, fields: &mut HashMap<String, String>) -> Result<(), String> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::file_path(path).map_err(|e| e.to_string())?;

    if ms.has_exif() {
        let iter: ExifIter = match parser.parse(ms) {
            Ok(iter) => iter,
            Err(e) if is_missing_exif(&e) => {
                log::debug!("No EXIF data found in {}", path.display());
                return Ok(());
            }
            Err(e) => return Err(e.to_string()),
        };
        let exif: Exif = iter.into();

        for (tag, name) in [
            (ExifTag::DateTimeOriginal, "DateTimeOriginal"),
            (ExifTag::CreateDate, "CreateDate"),
        ] {
            if let Some(value) = exif.get(tag).and_then(entry_to_timestamp) {
                fields.insert(name.to_string(), value);
            }
        }
    } else if ms.has_track() {
        let info: TrackInfo = parser.parse(ms).map_err(|e| e.to_string())?;

        if let Some(value) = info.get(TrackInfoTag::CreateDate).and_then(entry_to_timestamp) {
            fields.insert("CreateDate".to_string(), value);
        }
    }
    Ok(())
}

/// nom-exif reports "the image has no EXIF block" through the same error variant as a
/// damaged block; only the message tells them apart.
fn is_missing_exif(err: &nom_exif::Error) -> bool {
    match err {
        nom_exif::Error::ParseFailed(e) => {
            let msg = e.to_string().to_ascii_lowercase();
            msg.contains("exif not found") || msg.contains("no exif data")
        }
        _ => false,
    }
}

/// Render a date entry in exiftool's layout so the parser sees the same shapes
/// regardless of backend.
fn entry_to_timestamp(val: &EntryValue) -> Option<String> {
    let s = match val {
        EntryValue::Time(t) => t.format(EXIF_DATE_OFFSET_FORMAT).to_string(),
        EntryValue::NaiveDateTime(t) => t.format(EXIF_DATE_FORMAT).to_string(),
        EntryValue::Text(s) => s.trim().trim_end_matches('\0').to_string(),
        _ => return None,
    };
    if s.is_empty() { None } else { Some(s) }
}

/// Identify a file's container from its magic bytes.
///
/// Returns exiftool's `FileType` tag, or `None` when the format is not recognised.
/// Only the handful of formats that show up in a camera roll are detected.
pub fn sniff_file_type(path: &Path) -> Result<Option<&'static str>> {
    let mut file = std::fs::File::open(path).context("Failed to open file")?;
    let mut header = Vec::with_capacity(SNIFF_LEN);
    file.by_ref()
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut header)
        .context("Failed to read file header")?;
    Ok(file_type_from_header(&header))
}

fn file_type_from_header(header: &[u8]) -> Option<&'static str> {
    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("JPEG");
    }
    if header.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some("PNG");
    }
    if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        return Some("GIF");
    }
    if header.starts_with(b"II*\0") || header.starts_with(b"MM\0*") {
        return Some("TIFF");
    }
    if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
        return Some("WEBP");
    }
    // ISO base media: [size:4]["ftyp"][major brand:4]
    if header.len() >= 12 && &header[4..8] == b"ftyp" {
        return match &header[8..12] {
            b"heic" | b"heix" | b"heim" | b"heis" | b"hevc" | b"hevx" | b"mif1" | b"msf1" => {
                Some("HEIC")
            }
            b"qt  " => Some("MOV"),
            _ => Some("MP4"),
        };
    }
    // Old QuickTime files start with a moov/mdat/wide atom instead of ftyp.
    if header.len() >= 8 && matches!(&header[4..8], b"moov" | b"mdat" | b"wide" | b"free") {
        return Some("MOV");
    }
    None
}
