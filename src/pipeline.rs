use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{FileError, RenameError, StartupError, file_name};
use crate::metadata::MetadataExtractor;
use crate::naming::NameAllocator;
use crate::timestamp;

/// A media type we know how to name, keyed by the reader's `FileType` tag.
///
/// Use [`MediaKind::from_file_type`] (or [`classify`]) to map a tag. Matching is exact
/// and case-sensitive, following exiftool's tags.
///
/// # Example
///
/// ```rust
/// use exif_renamer::pipeline::MediaKind;
///
/// assert_eq!(MediaKind::from_file_type("HEIC"), Some(MediaKind::Heic));
/// assert_eq!(MediaKind::from_file_type("MOV").unwrap().extension(), "mov");
/// assert_eq!(MediaKind::from_file_type("GIF"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Jpeg,
    Heic,
    Png,
    Mp4,
    Mov,
}

impl MediaKind {
    pub fn from_file_type(file_type: &str) -> Option<Self> {
        match file_type {
            "JPEG" => Some(Self::Jpeg),
            "HEIC" => Some(Self::Heic),
            "PNG" => Some(Self::Png),
            "MP4" => Some(Self::Mp4),
            "MOV" => Some(Self::Mov),
            _ => None,
        }
    }

    /// Extension used in the canonical name, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Heic => "heic",
            Self::Png => "png",
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
        }
    }
}

/// Map a reported file type to a [`MediaKind`], or fail with
/// [`RenameError::UnsupportedType`].
pub fn classify(file_type: &str) -> Result<MediaKind, RenameError> {
    MediaKind::from_file_type(file_type)
        .ok_or_else(|| RenameError::UnsupportedType(file_type.to_string()))
}

/// A move from a file's old name to its canonical one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// A file that was processed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// Moved to a new canonical name (or would have been, in a dry run).
    Renamed(Rename),
    /// Already carried its canonical name; nothing to do.
    AlreadyCanonical(PathBuf),
}

/// Exactly one of these is produced per discovered file.
pub type ProcessingOutcome = Result<Processed, FileError>;

/// Summary of one run over a directory tree.
///
/// `errors` is in completion order, which differs from discovery order when more than
/// one worker is running.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Files handed to the workers by discovery.
    pub discovered: usize,
    pub renamed: Vec<Rename>,
    pub already_canonical: usize,
    pub errors: Vec<FileError>,
    /// Whether renames were only simulated.
    pub dry_run: bool,
}

impl RunReport {
    fn record(&mut self, outcome: ProcessingOutcome) {
        match outcome {
            Ok(Processed::Renamed(rename)) => self.renamed.push(rename),
            Ok(Processed::AlreadyCanonical(_)) => self.already_canonical += 1,
            Err(error) => self.errors.push(error),
        }
    }

    /// Files that reached a terminal state, successful or not.
    pub fn processed(&self) -> usize {
        self.renamed.len() + self.already_canonical + self.errors.len()
    }

    pub fn succeeded(&self) -> usize {
        self.renamed.len() + self.already_canonical
    }
}

/// The discovery → queue → workers rename pipeline.
///
/// One blocking task walks the tree and feeds file paths into a bounded queue; a pool
/// of workers takes paths off the queue and runs each file through
/// extract → classify → resolve → parse → allocate → rename. A failure at any step is
/// recorded for that file alone.
///
/// The pipeline is cheap to clone; clones share the metadata reader and the name
/// allocator.
///
/// # Example
///
/// ```rust,no_run
/// use exif_renamer::config::Config;
/// use exif_renamer::metadata::build_extractor;
/// use exif_renamer::pipeline::Pipeline;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::default();
/// let extractor = build_extractor(&config.extractor).await?;
/// let pipeline = Pipeline::new(extractor, &config);
///
/// let report = pipeline.run(Path::new("./photos")).await?;
/// for error in &report.errors {
///     eprintln!("{error}");
/// }
/// println!("{} renamed, {} issues", report.renamed.len(), report.errors.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Pipeline {
    extractor: Arc<dyn MetadataExtractor>,
    allocator: Arc<NameAllocator>,
    workers: usize,
    queue_capacity: usize,
    dry_run: bool,
}

impl Pipeline {
    pub fn new(extractor: Arc<dyn MetadataExtractor>, config: &Config) -> Self {
        Self {
            extractor,
            allocator: Arc::new(NameAllocator::new(config.naming.max_sequence)),
            workers: config.pipeline.workers.max(1),
            queue_capacity: config.pipeline.queue_capacity.max(1),
            dry_run: config.output.dry_run,
        }
    }

    /// Rename every supported file under `root`.
    ///
    /// Only fails when `root` is unusable; per-file problems end up in
    /// [`RunReport::errors`].
    pub async fn run(&self, root: &Path) -> Result<RunReport, StartupError> {
        if !root.exists() {
            return Err(StartupError::MissingRoot(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(StartupError::NotADirectory(root.to_path_buf()));
        }

        log::info!(
            "Processing {} with {} worker(s) using the {} reader",
            root.display(),
            self.workers,
            self.extractor.name()
        );

        let (path_tx, path_rx) = mpsc::channel::<PathBuf>(self.queue_capacity);
        let discovery = {
            let root = root.to_path_buf();
            tokio::task::spawn_blocking(move || discover(&root, path_tx))
        };

        let path_rx = Arc::new(Mutex::new(path_rx));
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            let pipeline = self.clone();
            let path_rx = Arc::clone(&path_rx);
            let outcome_tx = outcome_tx.clone();
            workers.spawn(async move { pipeline.work(id, path_rx, outcome_tx).await });
        }
        drop(outcome_tx);

        let mut report = RunReport {
            dry_run: self.dry_run,
            ..RunReport::default()
        };
        while let Some(outcome) = outcome_rx.recv().await {
            if let Err(ref error) = outcome {
                log::debug!("{error}");
            }
            report.record(outcome);
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                log::error!("Worker task failed: {e}");
            }
        }
        report.discovered = match discovery.await {
            Ok(count) => count,
            Err(e) => {
                log::error!("Discovery task failed: {e}");
                report.processed()
            }
        };

        log::debug!(
            "Discovered {} file(s), processed {}",
            report.discovered,
            report.processed()
        );
        Ok(report)
    }

    /// Consume paths until discovery closes the queue.
    async fn work(
        self,
        id: usize,
        paths: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
        outcomes: mpsc::UnboundedSender<ProcessingOutcome>,
    ) {
        let mut count = 0usize;
        loop {
            let next = paths.lock().await.recv().await;
            let Some(path) = next else {
                break;
            };
            count += 1;

            let outcome = self
                .process_file(&path)
                .await
                .map_err(|error| FileError::new(path, error));
            if outcomes.send(outcome).is_err() {
                break;
            }
        }
        log::debug!("Worker {id} consumed {count} file(s)");
    }

    /// Run a single file through the pipeline.
    ///
    /// 1. **Extract** — read metadata with the shared reader
    /// 2. **Classify** — map `FileType` to an extension
    /// 3. **Resolve** — pick the first usable capture-time field
    /// 4. **Parse** — turn it into a [`CaptureTime`](crate::timestamp::CaptureTime)
    /// 5. **Allocate** — find the first free canonical name next to the file
    /// 6. **Rename** — skipped when the file already has that name, or in a dry run
    pub async fn process_file(&self, path: &Path) -> Result<Processed, RenameError> {
        let record = self
            .extractor
            .extract(path)
            .await
            .map_err(|e| RenameError::Extraction(format!("{e:#}")))?;
        if let Some(error) = record.error() {
            return Err(RenameError::Extraction(error.to_string()));
        }

        let file_type = record
            .file_type()
            .ok_or_else(|| RenameError::Extraction("no file type reported".to_string()))?;
        let kind = classify(file_type)?;

        let raw = timestamp::resolve(&record)?;
        let time = timestamp::parse(raw)?;

        let directory = path.parent().unwrap_or_else(|| Path::new(""));
        let target = self
            .allocator
            .allocate(directory, &time, kind.extension(), path)?;

        if target == path {
            log::debug!("{} is already canonical", file_name(path));
            return Ok(Processed::AlreadyCanonical(target));
        }

        if self.dry_run {
            log::info!("would rename {} to {}", file_name(path), file_name(&target));
        } else {
            log::info!("renaming {} to {}", file_name(path), file_name(&target));
            if let Err(source) = tokio::fs::rename(path, &target).await {
                self.allocator.release(&target);
                return Err(RenameError::Rename { target, source });
            }
        }

        Ok(Processed::Renamed(Rename {
            from: path.to_path_buf(),
            to: target,
        }))
    }
}

/// Walk `root` and push every regular file into the queue. Returns the number of
/// paths sent. Blocks when the queue is full.
///
/// Symlinks are neither followed nor renamed. Entries that cannot be read are logged
/// and skipped.
fn discover(root: &Path, queue: mpsc::Sender<PathBuf>) -> usize {
    let mut produced = 0;
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if queue.blocking_send(entry.into_path()).is_err() {
            log::warn!("All workers stopped; ending discovery early");
            break;
        }
        produced += 1;
    }
    log::debug!("Discovery produced {produced} file(s)");
    produced
}
