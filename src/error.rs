use std::path::PathBuf;
use thiserror::Error;

/// Outcome of stripping a single image when it did not produce a file.
///
/// `SkippedByRule` is not a failure: it is the deliberate no-op of
/// [`ConflictRule::Skip`](crate::config::ConflictRule::Skip) and is tallied
/// separately by the batch driver.
#[derive(Error, Debug)]
pub enum StripError {
    /// The input could not be decoded as an image, or holds no frame.
    #[error("cannot read image: {0}")]
    InvalidImage(String),

    /// The destination encoder or file could not be created.
    #[error("cannot create output file: {0}")]
    CannotCreateDestination(String),

    /// Encoding or finalizing the destination failed; partial output was removed.
    #[error("write failed: {0}")]
    CannotWrite(String),

    /// The destination already exists and the conflict rule says to leave it alone.
    #[error("skipped, output already exists: {}", .0.display())]
    SkippedByRule(PathBuf),

    /// The destination appeared before it could be materialized without
    /// replacing it. Consumed by the output resolver.
    #[error("output already exists: {}", .0.display())]
    DestinationExists(PathBuf),
}

impl StripError {
    /// Whether this outcome counts as a skip rather than a failure.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::SkippedByRule(_))
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidImage(_) => "invalidImage",
            Self::CannotCreateDestination(_) => "cannotCreateDestination",
            Self::CannotWrite(_) => "cannotWrite",
            Self::SkippedByRule(_) => "skippedByRule",
            Self::DestinationExists(_) => "destinationExists",
        }
    }
}

/// Contract violations that abort a batch before any item runs.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("output directory is missing or not a directory: {}", .0.display())]
    OutputDirectory(PathBuf),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
