//! # exif-renamer
//!
//! Rename photos and videos to canonical, collision-free names derived from the capture
//! time stored in their metadata: `2023-05-01_101530_01.jpg`.
//!
//! ## Quick Start
//!
//! The pipeline module handles the whole walk → read → rename flow:
//!
//! ```rust,no_run
//! use exif_renamer::config::Config;
//! use exif_renamer::metadata::build_extractor;
//! use exif_renamer::pipeline::Pipeline;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!
//!     // Start the metadata reader once; every worker shares it.
//!     let extractor = build_extractor(&config.extractor).await?;
//!     let report = Pipeline::new(extractor, &config)
//!         .run(Path::new("./photos"))
//!         .await?;
//!
//!     for error in &report.errors {
//!         eprintln!("{error}");
//!     }
//!     println!("Renamed {} file(s)", report.renamed.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! Each step is available on its own:
//!
//! ```rust,no_run
//! use exif_renamer::metadata::{MetadataExtractor, NativeExtractor};
//! use exif_renamer::naming::NameAllocator;
//! use exif_renamer::pipeline::classify;
//! use exif_renamer::timestamp;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let path = Path::new("photos/IMG_0001.JPG");
//!
//!     let record = NativeExtractor::new().extract(path).await?;
//!     let kind = classify(record.file_type().unwrap_or_default())?;
//!     let time = timestamp::parse(timestamp::resolve(&record)?)?;
//!
//!     let target = NameAllocator::default().allocate(
//!         path.parent().unwrap(),
//!         &time,
//!         kind.extension(),
//!         path,
//!     )?;
//!     println!("{} -> {}", path.display(), target.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Reported type | Extension | Typical timestamp field |
//! |---------------|-----------|-------------------------|
//! | JPEG | `.jpg` | `DateTimeOriginal`, `CreateDate` |
//! | HEIC | `.heic` | `SubSecDateTimeOriginal` |
//! | PNG | `.png` | `DateTimeOriginal` |
//! | MP4 | `.mp4` | `DateTimeOriginal`, `ContentCreateDate` |
//! | MOV | `.mov` | `CreationDate`, `ContentCreateDate` |
//!
//! ## Modules
//!
//! - [`config`] — Configuration types and loading/saving
//! - [`error`] — Per-file and startup error kinds
//! - [`metadata`] — Metadata readers (built-in and exiftool)
//! - [`naming`] — Canonical name allocation
//! - [`pipeline`] — Concurrent discovery/rename pipeline and type classification
//! - [`timestamp`] — Capture-time field resolution and parsing

pub mod config;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod pipeline;
pub mod timestamp;
