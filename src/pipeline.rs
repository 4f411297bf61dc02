use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use walkdir::WalkDir;

use crate::codec::{self, ImageFormat};
use crate::config::{Config, OutputConfiguration, StripMode};
use crate::error::{BatchError, StripError};
use crate::output::{ClaimRegistry, place};

/// One input image accepted into a batch.
///
/// Only paths with a supported image extension can be turned into a
/// reference; everything else is filtered out before it reaches the codec.
///
/// # Example
///
/// ```rust
/// use exif_remover::codec::ImageFormat;
/// use exif_remover::pipeline::ImageReference;
///
/// let image = ImageReference::new("holiday/IMG_0042.JPG").unwrap();
/// assert_eq!(image.format(), ImageFormat::Jpeg);
///
/// assert!(ImageReference::new("notes.txt").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    path: PathBuf,
    format: ImageFormat,
}

impl ImageReference {
    /// Accept `path` if its extension names a supported image format.
    pub fn new(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let format = ImageFormat::from_path(&path)?;
        Some(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format inferred from the extension.
    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

/// Collect supported image references from a list of paths (files or directories).
///
/// Directories are walked recursively. Unsupported files given explicitly
/// are logged and dropped; unsupported files inside directories are ignored.
pub fn collect_images(paths: &[PathBuf]) -> Vec<ImageReference> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            match ImageReference::new(path.clone()) {
                Some(image) => images.push(image),
                None => log::warn!("Skipping unsupported file: {}", path.display()),
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && codec::is_supported(p) {
                    images.extend(ImageReference::new(p.to_path_buf()));
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// How a single item ended.
#[derive(Debug)]
pub enum ItemOutcome {
    /// Written to this path.
    Success(PathBuf),
    /// Left alone because this destination already exists.
    Skipped(PathBuf),
    Failed(StripError),
}

impl From<Result<PathBuf, StripError>> for ItemOutcome {
    fn from(result: Result<PathBuf, StripError>) -> Self {
        match result {
            Ok(path) => Self::Success(path),
            Err(StripError::SkippedByRule(path)) => Self::Skipped(path),
            Err(e) => Self::Failed(e),
        }
    }
}

/// Aggregate tallies for one batch run.
///
/// Serialized as `{"successCount": n, "failureCount": n, "skippedCount": n}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped_count: usize,
}

impl BatchResult {
    /// Number of items accounted for.
    pub fn total(&self) -> usize {
        self.success_count + self.failure_count + self.skipped_count
    }

    fn record(mut self, outcome: &ItemOutcome) -> Self {
        match outcome {
            ItemOutcome::Success(_) => self.success_count += 1,
            ItemOutcome::Skipped(_) => self.skipped_count += 1,
            ItemOutcome::Failed(_) => self.failure_count += 1,
        }
        self
    }

    fn merge(self, other: Self) -> Self {
        Self {
            success_count: self.success_count + other.success_count,
            failure_count: self.failure_count + other.failure_count,
            skipped_count: self.skipped_count + other.skipped_count,
        }
    }
}

/// Report handed to the progress observer after each item.
#[derive(Debug)]
pub struct Progress<'a> {
    /// Items finished so far, including this one.
    pub completed: usize,
    pub total: usize,
    pub image: &'a ImageReference,
    pub outcome: &'a ItemOutcome,
}

/// Progress observer. Called from worker threads, in completion order.
pub type ProgressFn = Arc<dyn Fn(&Progress<'_>) + Send + Sync>;

/// Per-run processing options.
#[derive(Clone, Default)]
pub struct BatchOptions {
    pub mode: StripMode,
    /// `0` uses the global rayon pool, `1` runs sequentially in input order,
    /// anything else builds a pool of that many threads.
    pub jobs: usize,
    pub progress: Option<ProgressFn>,
}

impl BatchOptions {
    /// Options taken from the `processing` section of a config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.processing.mode,
            jobs: config.processing.jobs,
            progress: None,
        }
    }

    /// Attach a progress observer.
    pub fn with_progress(
        mut self,
        progress: impl Fn(&Progress<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }
}

impl std::fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOptions")
            .field("mode", &self.mode)
            .field("jobs", &self.jobs)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Shared state for one run.
struct Run<'a> {
    output_dir: &'a Path,
    config: OutputConfiguration,
    mode: StripMode,
    registry: ClaimRegistry,
    completed: AtomicUsize,
    total: usize,
    progress: Option<&'a ProgressFn>,
}

impl Run<'_> {
    fn process(&self, image: &ImageReference) -> BatchResult {
        let result = place(image.path(), self.output_dir, &self.config, self.mode, &self.registry);
        let outcome = ItemOutcome::from(result);

        match &outcome {
            ItemOutcome::Success(out) => {
                log::info!("Cleaned {} -> {}", image.path().display(), out.display())
            }
            ItemOutcome::Skipped(out) => {
                log::info!("Skipped {} ({} exists)", image.path().display(), out.display())
            }
            ItemOutcome::Failed(e) => log::warn!("Failed {}: {e}", image.path().display()),
        }

        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(progress) = self.progress {
            progress(&Progress {
                completed,
                total: self.total,
                image,
                outcome: &outcome,
            });
        }

        BatchResult::default().record(&outcome)
    }
}

/// Strip every input into `output_dir`.
///
/// Per-item failures never abort the batch: each item ends up counted in
/// exactly one of the three tallies, so `result.total() == inputs.len()`.
/// The batch itself fails only when the output directory is unusable or the
/// worker pool cannot be built, both checked before any item runs.
///
/// `config` is snapshotted (normalized) at the start of the run.
///
/// # Example
///
/// ```rust,no_run
/// use exif_remover::config::OutputConfiguration;
/// use exif_remover::pipeline::{BatchOptions, collect_images, run_batch};
/// use std::path::{Path, PathBuf};
///
/// let images = collect_images(&[PathBuf::from("./photos")]);
/// let result = run_batch(
///     &images,
///     Path::new("./cleaned"),
///     &OutputConfiguration::default(),
///     &BatchOptions::default(),
/// )?;
/// println!("{} cleaned, {} failed", result.success_count, result.failure_count);
/// # Ok::<(), exif_remover::BatchError>(())
/// ```
pub fn run_batch(
    inputs: &[ImageReference],
    output_dir: &Path,
    config: &OutputConfiguration,
    options: &BatchOptions,
) -> Result<BatchResult, BatchError> {
    if !output_dir.is_dir() {
        return Err(BatchError::OutputDirectory(output_dir.to_path_buf()));
    }

    let pool = match options.jobs {
        0 | 1 => None,
        n => Some(rayon::ThreadPoolBuilder::new().num_threads(n).build()?),
    };

    let run = Run {
        output_dir,
        config: config.normalized(),
        mode: options.mode,
        registry: ClaimRegistry::new(),
        completed: AtomicUsize::new(0),
        total: inputs.len(),
        progress: options.progress.as_ref(),
    };

    log::info!(
        "Processing {} image(s) into {} (suffix '{}', {})",
        inputs.len(),
        output_dir.display(),
        run.config.suffix,
        run.config.conflict_rule
    );

    let parallel = || {
        inputs
            .par_iter()
            .map(|image| run.process(image))
            .reduce(BatchResult::default, BatchResult::merge)
    };

    let result = match (options.jobs, pool) {
        (1, _) => inputs
            .iter()
            .fold(BatchResult::default(), |acc, image| acc.merge(run.process(image))),
        (_, Some(pool)) => pool.install(parallel),
        (_, None) => parallel(),
    };

    log::info!(
        "Batch done: {} succeeded, {} failed, {} skipped",
        result.success_count,
        result.failure_count,
        result.skipped_count
    );
    Ok(result)
}

/// Run a batch on tokio's blocking pool.
///
/// Inputs and configuration are moved into the task, so the caller's copies
/// can change freely while it runs.
pub fn spawn_batch(
    inputs: Vec<ImageReference>,
    output_dir: PathBuf,
    config: OutputConfiguration,
    options: BatchOptions,
) -> tokio::task::JoinHandle<Result<BatchResult, BatchError>> {
    tokio::task::spawn_blocking(move || run_batch(&inputs, &output_dir, &config, &options))
}
