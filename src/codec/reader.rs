use anyhow::{Context, Result};
use img_parts::Bytes;
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::webp::WebP;
use nom_exif::*;
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

use super::{
    ICC_HEADER, ImageFormat, MetadataKind, classify_jpeg_segment, classify_png_chunk,
    classify_webp_chunk, split_jpeg,
};

/// Which metadata an image carries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetadataReport {
    /// Format sniffed from content, falling back to the extension.
    #[serde(serialize_with = "serialize_format")]
    pub format: Option<ImageFormat>,
    pub dimensions: Option<(u32, u32)>,
    /// Metadata blocks found, one entry per block, in file order.
    #[serde(serialize_with = "serialize_kinds")]
    pub blocks: Vec<MetadataKind>,
    /// An embedded colour profile. Kept by stripping, so not counted as metadata.
    pub has_icc_profile: bool,
    pub has_gps: bool,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub make: Option<String>,
    pub model: Option<String>,
}

impl MetadataReport {
    /// Whether a block of this kind is present.
    pub fn has(&self, kind: MetadataKind) -> bool {
        self.blocks.contains(&kind)
    }

    /// No metadata blocks and no GPS position.
    pub fn is_clean(&self) -> bool {
        self.blocks.is_empty() && !self.has_gps
    }
}

fn serialize_format<S: serde::Serializer>(
    format: &Option<ImageFormat>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match format {
        Some(f) => serializer.serialize_some(&f.to_string()),
        None => serializer.serialize_none(),
    }
}

fn serialize_kinds<S: serde::Serializer>(
    kinds: &[MetadataKind],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(kinds.iter().map(|k| k.to_string()))
}

/// Inspect an image file and report its metadata.
///
/// Container blocks are found with img-parts (JPEG, PNG, WebP); GPS and
/// camera fields come from nom-exif for any format it understands.
pub fn read_metadata(path: &Path) -> Result<MetadataReport> {
    let bytes = std::fs::read(path).context("Failed to open image file")?;

    let mut report = MetadataReport {
        format: image::guess_format(&bytes)
            .ok()
            .and_then(ImageFormat::from_sniffed)
            .or_else(|| ImageFormat::from_path(path)),
        dimensions: image::ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .ok()
            .and_then(|r| r.into_dimensions().ok()),
        ..Default::default()
    };

    let bytes = Bytes::from(bytes);
    match report.format {
        Some(ImageFormat::Jpeg) => scan_jpeg(bytes, &mut report),
        Some(ImageFormat::Png) => scan_png(bytes, &mut report),
        Some(ImageFormat::WebP) => scan_webp(bytes, &mut report),
        _ => {}
    }

    read_exif_fields(path, &mut report);
    Ok(report)
}

fn scan_jpeg(bytes: Bytes, report: &mut MetadataReport) {
    let Ok(jpeg) = Jpeg::from_bytes(bytes) else {
        log::debug!("Could not parse JPEG segments");
        return;
    };
    for segment in jpeg.segments() {
        let contents = segment.contents();
        if segment.marker() == 0xE2 && contents.starts_with(ICC_HEADER) {
            report.has_icc_profile = true;
        }
        if let Some(kind) = classify_jpeg_segment(segment.marker(), contents) {
            report.blocks.push(kind);
        }
    }

    let (_, scans) = split_jpeg(jpeg);
    report.blocks.extend(scans.dropped);
    // Appended images and vendor trailers can carry their own EXIF.
    if scans.trailing > 0 {
        report.blocks.push(MetadataKind::Other);
    }
}

fn scan_png(bytes: Bytes, report: &mut MetadataReport) {
    let Ok(png) = Png::from_bytes(bytes) else {
        log::debug!("Could not parse PNG chunks");
        return;
    };
    for chunk in png.chunks() {
        if chunk.kind() == *b"iCCP" {
            report.has_icc_profile = true;
        }
        if let Some(kind) = classify_png_chunk(chunk.kind(), chunk.contents()) {
            report.blocks.push(kind);
        }
    }
}

fn scan_webp(bytes: Bytes, report: &mut MetadataReport) {
    let Ok(webp) = WebP::from_bytes(bytes) else {
        log::debug!("Could not parse WebP chunks");
        return;
    };
    for chunk in webp.chunks() {
        if chunk.id() == *b"ICCP" {
            report.has_icc_profile = true;
        }
        if let Some(kind) = classify_webp_chunk(chunk.id()) {
            report.blocks.push(kind);
        }
    }
}

/// Fill GPS and camera fields from the EXIF directory, if any.
fn read_exif_fields(path: &Path, report: &mut MetadataReport) {
    let mut parser = MediaParser::new();
    let ms = match MediaSource::file_path(path) {
        Ok(ms) => ms,
        Err(e) => {
            log::debug!("nom-exif cannot open {}: {e}", path.display());
            return;
        }
    };

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(_) => {
            log::debug!("No EXIF data found in {}", path.display());
            return;
        }
    };

    // Parse GPS info before converting to Exif (consumes the iterator)
    let gps_info = iter.parse_gps_info().ok().flatten();
    let exif: Exif = iter.into();

    // Formats without container scanning (TIFF, HEIF, RAW) still report EXIF.
    if !report.has(MetadataKind::Exif) {
        report.blocks.push(MetadataKind::Exif);
    }

    report.make = exif.get(ExifTag::Make).and_then(entry_to_string);
    report.model = exif.get(ExifTag::Model).and_then(entry_to_string);

    if let Some(gps) = gps_info {
        report.has_gps = true;
        report.gps_latitude = Some(latlng_to_decimal(&gps.latitude, gps.latitude_ref));
        report.gps_longitude = Some(latlng_to_decimal(&gps.longitude, gps.longitude_ref));
    }
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').to_string();
    if s.is_empty() { None } else { Some(s) }
}

/// Convert a nom-exif LatLng (3 URationals: deg, min, sec) to decimal degrees.
fn latlng_to_decimal(latlng: &LatLng, reference: char) -> f64 {
    let degrees = latlng.0.0 as f64 / latlng.0.1 as f64;
    let minutes = latlng.1.0 as f64 / latlng.1.1 as f64;
    let seconds = latlng.2.0 as f64 / latlng.2.1 as f64;

    let mut coord = degrees + minutes / 60.0 + seconds / 3600.0;

    if reference == 'S' || reference == 'W' {
        coord = -coord;
    }

    coord
}
