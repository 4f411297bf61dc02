//! Destination naming and conflict handling.
//!
//! Turns an input path, an output directory, and an [`OutputConfiguration`]
//! into a concrete destination, then hands off to the codec. Paths that are
//! being written but do not exist yet are tracked in a [`ClaimRegistry`], so
//! concurrent items never resolve to the same file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::codec::{self, StripOptions};
use crate::config::{ConflictRule, OutputConfiguration, StripMode};
use crate::error::StripError;

/// Extension used when the input has none.
const DEFAULT_EXTENSION: &str = "jpg";

/// Destination paths that are claimed but not yet materialized on disk.
///
/// Every filesystem check during resolution happens while holding the
/// registry lock, so "does it exist?" and "claim it" are one atomic step.
#[derive(Debug, Default)]
pub struct ClaimRegistry {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `path` is currently claimed by an in-flight item.
    pub fn is_claimed(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }
}

/// A claimed destination. The claim is released on drop.
#[derive(Debug)]
pub struct Claim<'a> {
    registry: &'a ClaimRegistry,
    path: PathBuf,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.path);
    }
}

/// A resolved destination ready for writing.
#[derive(Debug)]
pub struct Destination<'a> {
    pub path: PathBuf,
    /// The `_N` index used, if any.
    pub index: Option<u32>,
    /// Whether an existing file at `path` may be replaced.
    pub replace: bool,
    _claim: Option<Claim<'a>>,
}

/// Result of applying the conflict rule.
#[derive(Debug)]
pub enum Resolution<'a> {
    Write(Destination<'a>),
    /// `Skip` rule and the destination is taken.
    Skip(PathBuf),
}

/// Split an input path into base name and extension (defaulting to `jpg`).
fn name_parts(input: &Path) -> (String, String) {
    let base = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    (base, ext)
}

/// Build the output file name for `input`.
///
/// `base + suffix + ("_" + index) + "." + ext`, with the suffix trimmed.
///
/// # Example
///
/// ```rust
/// use exif_remover::config::{ConflictRule, OutputConfiguration};
/// use exif_remover::output::candidate_name;
/// use std::path::Path;
///
/// let cfg = OutputConfiguration::new(" _clean ", ConflictRule::AppendIndex);
/// assert_eq!(candidate_name(Path::new("/in/photo.jpg"), &cfg, None), "photo_clean.jpg");
/// assert_eq!(candidate_name(Path::new("/in/photo.jpg"), &cfg, Some(2)), "photo_clean_2.jpg");
/// assert_eq!(candidate_name(Path::new("/in/scan"), &cfg, None), "scan_clean.jpg");
/// ```
pub fn candidate_name(input: &Path, config: &OutputConfiguration, index: Option<u32>) -> String {
    let (base, ext) = name_parts(input);
    candidate(&base, config.sanitized_suffix(), index, &ext)
}

fn candidate(base: &str, suffix: &str, index: Option<u32>, ext: &str) -> String {
    match index {
        Some(i) => format!("{base}{suffix}_{i}.{ext}"),
        None => format!("{base}{suffix}.{ext}"),
    }
}

fn next_index(index: Option<u32>) -> Option<u32> {
    Some(index.map_or(1, |i| i + 1))
}

/// Apply the conflict rule and claim the destination.
///
/// Does not touch the filesystem beyond existence checks.
pub fn resolve<'a>(
    input: &Path,
    output_dir: &Path,
    config: &OutputConfiguration,
    registry: &'a ClaimRegistry,
) -> Resolution<'a> {
    resolve_from(input, output_dir, config, registry, None)
}

fn resolve_from<'a>(
    input: &Path,
    output_dir: &Path,
    config: &OutputConfiguration,
    registry: &'a ClaimRegistry,
    start: Option<u32>,
) -> Resolution<'a> {
    let (base, ext) = name_parts(input);
    let suffix = config.sanitized_suffix();
    let path_for = |index| output_dir.join(candidate(&base, suffix, index, &ext));

    match config.conflict_rule {
        ConflictRule::AppendIndex => {
            let mut claimed = registry.lock();
            let mut index = start;
            loop {
                let path = path_for(index);
                if !path.exists() && !claimed.contains(&path) {
                    claimed.insert(path.clone());
                    return Resolution::Write(Destination {
                        path: path.clone(),
                        index,
                        replace: false,
                        _claim: Some(Claim { registry, path }),
                    });
                }
                index = next_index(index);
            }
        }
        ConflictRule::Overwrite => Resolution::Write(Destination {
            path: path_for(None),
            index: None,
            replace: true,
            _claim: None,
        }),
        ConflictRule::Skip => {
            let mut claimed = registry.lock();
            let path = path_for(None);
            if path.exists() || claimed.contains(&path) {
                return Resolution::Skip(path);
            }
            claimed.insert(path.clone());
            Resolution::Write(Destination {
                path: path.clone(),
                index: None,
                replace: false,
                _claim: Some(Claim { registry, path }),
            })
        }
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Remove the file an `Overwrite` is about to replace. Best-effort.
fn remove_existing(path: &Path, input: &Path) {
    if !path.exists() || is_same_file(path, input) {
        return;
    }
    match std::fs::remove_file(path) {
        Ok(()) => log::debug!("Removed existing {}", path.display()),
        Err(e) => log::debug!("Could not remove {}: {e}", path.display()),
    }
}

/// Resolve the destination for `input` and strip it there.
///
/// Returns the written path, or [`StripError::SkippedByRule`] when the `Skip`
/// rule applies. If the destination appears on disk between resolving and
/// writing, `AppendIndex` moves on to the next index and `Skip` skips.
///
/// # Example
///
/// ```rust,no_run
/// use exif_remover::config::{ConflictRule, OutputConfiguration, StripMode};
/// use exif_remover::output::{ClaimRegistry, place};
/// use std::path::Path;
///
/// let cfg = OutputConfiguration::new("_clean", ConflictRule::AppendIndex);
/// let registry = ClaimRegistry::new();
/// let mode = StripMode::Lossless;
/// let written = place(Path::new("photo.jpg"), Path::new("out"), &cfg, mode, &registry)?;
/// println!("{}", written.display());
/// # Ok::<(), exif_remover::StripError>(())
/// ```
pub fn place(
    input: &Path,
    output_dir: &Path,
    config: &OutputConfiguration,
    mode: StripMode,
    registry: &ClaimRegistry,
) -> Result<PathBuf, StripError> {
    let mut start = None;
    loop {
        let destination = match resolve_from(input, output_dir, config, registry, start) {
            Resolution::Skip(path) => return Err(StripError::SkippedByRule(path)),
            Resolution::Write(destination) => destination,
        };

        if config.conflict_rule == ConflictRule::Overwrite {
            remove_existing(&destination.path, input);
        }

        let options = StripOptions {
            mode,
            replace: destination.replace,
        };
        match codec::strip_with(input, &destination.path, &options) {
            Err(StripError::DestinationExists(path)) => match config.conflict_rule {
                ConflictRule::AppendIndex => start = next_index(destination.index),
                _ => return Err(StripError::SkippedByRule(path)),
            },
            other => return other,
        }
    }
}
