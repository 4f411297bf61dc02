//! # exif-remover
//!
//! Strip EXIF, XMP, IPTC, comments and other embedded metadata from images,
//! writing clean copies next to a chosen output directory without touching
//! the originals.
//!
//! ## Quick Start
//!
//! The simplest way to use the library is through the pipeline module, which
//! collects images, names each destination, and strips them in parallel:
//!
//! ```rust,no_run
//! use exif_remover::config::Config;
//! use exif_remover::pipeline::{BatchOptions, collect_images, spawn_batch};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load config from file (suffix, conflict rule, worker count)
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!
//!     // Collect supported image files from paths (files or directories)
//!     let images = collect_images(&[PathBuf::from("./photos")]);
//!
//!     let options = BatchOptions::from_config(&config).with_progress(|p| {
//!         println!("[{}/{}] {}", p.completed, p.total, p.image.path().display());
//!     });
//!     let result = spawn_batch(images, PathBuf::from("./clean"), config.output, options).await??;
//!
//!     println!(
//!         "{} cleaned, {} skipped, {} failed",
//!         result.success_count, result.skipped_count, result.failure_count
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! For more control, inspect and strip single files with the codec and pick
//! destinations with the output resolver:
//!
//! ```rust,no_run
//! use exif_remover::codec::{read_metadata, strip};
//! use exif_remover::config::{ConflictRule, OutputConfiguration, StripMode};
//! use exif_remover::output::{ClaimRegistry, place};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let report = read_metadata(Path::new("photo.jpg"))?;
//!     println!("GPS: {:?}, {:?}", report.gps_latitude, report.gps_longitude);
//!
//!     // Write to an explicit path
//!     strip(Path::new("photo.jpg"), Path::new("photo_clean.jpg"))?;
//!
//!     // Or let the resolver name it: photo_clean_1.jpg if photo_clean.jpg exists
//!     let cfg = OutputConfiguration::new("_clean", ConflictRule::AppendIndex);
//!     let registry = ClaimRegistry::new();
//!     let mode = StripMode::Lossless;
//!     let written = place(Path::new("photo.jpg"), Path::new("."), &cfg, mode, &registry)?;
//!     println!("Wrote {}", written.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Stripping |
//! |--------|-----------|
//! | JPEG (`.jpg`, `.jpeg`) | Lossless: APPn/COM segments dropped, ICC kept |
//! | PNG (`.png`) | Lossless: eXIf and text chunks dropped, colour chunks kept |
//! | WebP (`.webp`) | Lossless for stills: EXIF/XMP chunks dropped |
//! | GIF, TIFF, BMP, ICO, TGA, QOI, PNM | Frame 0 re-encoded |
//! | HEIC/HEIF, AVIF, RAW | Recognized, reported as invalid |
//!
//! ## Modules
//!
//! - [`codec`]: format detection, metadata inspection and stripping
//! - [`config`]: configuration types and loading/saving
//! - [`error`]: per-item and per-batch error types
//! - [`notice`]: notice banner document parsing
//! - [`output`]: destination naming and conflict rules
//! - [`pipeline`]: image collection and the batch driver

pub mod codec;
pub mod config;
pub mod error;
pub mod notice;
pub mod output;
pub mod pipeline;

#[cfg(test)]
mod test_utils;

pub use error::{BatchError, StripError};
