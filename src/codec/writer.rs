use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ColorType, DynamicImage, ImageReader};
use img_parts::Bytes;
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::riff::{RiffChunk, RiffContent};
use img_parts::webp::WebP;
use std::borrow::Cow;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::{
    ImageFormat, classify_jpeg_segment, classify_png_chunk, classify_webp_chunk, split_jpeg,
};
use crate::config::StripMode;
use crate::error::StripError;

/// Quality used whenever a JPEG has to be re-encoded (1.0 on a 0–1 scale).
pub const JPEG_QUALITY: u8 = 100;

const CHUNK_ANIM: [u8; 4] = *b"ANIM";
const CHUNK_VP8X: [u8; 4] = *b"VP8X";
const VP8X_EXIF_FLAG: u8 = 0x08;
const VP8X_XMP_FLAG: u8 = 0x04;

/// How [`strip_with`] produces and places its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripOptions {
    pub mode: StripMode,
    /// Replace an existing file at the destination. When `false`, an existing
    /// destination yields [`StripError::DestinationExists`] and is left untouched.
    pub replace: bool,
}

impl Default for StripOptions {
    fn default() -> Self {
        Self {
            mode: StripMode::Lossless,
            replace: true,
        }
    }
}

/// Write a copy of `input` to `output` with all metadata removed.
///
/// Uses [`StripOptions::default`]: container-level stripping where possible,
/// replacing any existing file at `output`.
///
/// # Example
///
/// ```rust,no_run
/// use exif_remover::codec::strip;
/// use std::path::Path;
///
/// let written = strip(Path::new("photo.jpg"), Path::new("out/photo_clean.jpg"))?;
/// println!("Clean copy: {}", written.display());
/// # Ok::<(), exif_remover::StripError>(())
/// ```
pub fn strip(input: &Path, output: &Path) -> Result<PathBuf, StripError> {
    strip_with(input, output, &StripOptions::default())
}

/// Write a copy of `input` to `output` with all metadata removed.
///
/// Only frame 0 of multi-frame containers survives. The output format follows
/// the output path's extension (then the input's, then JPEG). Output is
/// staged in a temporary file next to `output` and renamed into place, so a
/// failure never leaves a partial file behind.
pub fn strip_with(
    input: &Path,
    output: &Path,
    options: &StripOptions,
) -> Result<PathBuf, StripError> {
    let bytes = std::fs::read(input)
        .map_err(|e| StripError::InvalidImage(format!("{}: {e}", input.display())))?;
    let decoded = decode_first_frame(&bytes, input)?;

    let target = ImageFormat::from_path(output)
        .or_else(|| ImageFormat::from_path(input))
        .unwrap_or(ImageFormat::Jpeg);
    let encoder_format = target.encoder_format().ok_or_else(|| {
        StripError::CannotCreateDestination(format!("{target} output is not supported"))
    })?;

    let mut staged = stage(output)?;

    let lossless = match options.mode {
        StripMode::Lossless if decoded.sniffed == Some(target) => strip_container(&bytes, target),
        _ => None,
    };

    let payload = match lossless {
        Some(payload) => payload,
        None => {
            log::debug!("Re-encoding frame 0 of {} as {target}", input.display());
            encode_frame(&decoded.image, encoder_format)
                .map_err(|e| StripError::CannotWrite(format!("{target} encode failed: {e}")))?
        }
    };

    staged
        .write_all(&payload)
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|e| StripError::CannotWrite(format!("{}: {e}", output.display())))?;

    // Mirror the input's permissions instead of the temp file's private mode.
    if let Ok(meta) = std::fs::metadata(input) {
        if let Err(e) = std::fs::set_permissions(staged.path(), meta.permissions()) {
            log::debug!("Could not copy permissions to {}: {e}", output.display());
        }
    }

    finalize(staged, output, options.replace)
}

struct DecodedFrame {
    image: DynamicImage,
    sniffed: Option<ImageFormat>,
}

/// Decode frame 0, sniffing the format from content and falling back to the
/// extension when the content is not recognized.
fn decode_first_frame(bytes: &[u8], path: &Path) -> Result<DecodedFrame, StripError> {
    let invalid = |e: &dyn std::fmt::Display| {
        StripError::InvalidImage(format!("{}: {e}", path.display()))
    };

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| invalid(&e))?;

    let sniffed = reader.format();
    if sniffed.is_none() {
        match ImageFormat::from_path(path).and_then(|f| f.encoder_format()) {
            Some(format) => reader.set_format(format),
            None => return Err(invalid(&"unrecognized image format")),
        }
    }

    let image = reader.decode().map_err(|e| invalid(&e))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(invalid(&"image has no frames"));
    }

    Ok(DecodedFrame {
        image,
        sniffed: sniffed.and_then(ImageFormat::from_sniffed),
    })
}

/// Create the temporary file the output is staged in.
fn stage(output: &Path) -> Result<NamedTempFile, StripError> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tempfile::Builder::new()
        .prefix(".exif-remover-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| StripError::CannotCreateDestination(format!("{}: {e}", dir.display())))
}

/// Move the staged file into place. On failure the temp file is dropped,
/// which removes it.
fn finalize(staged: NamedTempFile, output: &Path, replace: bool) -> Result<PathBuf, StripError> {
    let persisted = if replace {
        staged.persist(output)
    } else {
        staged.persist_noclobber(output)
    };

    match persisted {
        Ok(_) => Ok(output.to_path_buf()),
        Err(e) if !replace && e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            log::debug!("{} appeared while writing", output.display());
            Err(StripError::DestinationExists(output.to_path_buf()))
        }
        Err(e) => {
            let message = format!("{}: {}", output.display(), e.error);
            if let Err(cleanup) = e.file.close() {
                log::debug!("Could not remove staged output: {cleanup}");
            }
            Err(StripError::CannotWrite(message))
        }
    }
}

/// Drop metadata blocks without touching the compressed pixel data.
///
/// Returns `None` when the container is not eligible (unsupported format,
/// animated WebP) or cannot be parsed; the caller then re-encodes.
fn strip_container(bytes: &[u8], format: ImageFormat) -> Option<Vec<u8>> {
    let bytes = Bytes::copy_from_slice(bytes);
    match format {
        ImageFormat::Jpeg => strip_jpeg(bytes),
        ImageFormat::Png => strip_png(bytes),
        ImageFormat::WebP => strip_webp(bytes),
        _ => None,
    }
}

fn strip_jpeg(bytes: Bytes) -> Option<Vec<u8>> {
    let mut jpeg = match Jpeg::from_bytes(bytes) {
        Ok(jpeg) => jpeg,
        Err(e) => {
            log::debug!("img-parts could not parse JPEG: {e}");
            return None;
        }
    };

    jpeg.segments_mut().retain(|segment| {
        match classify_jpeg_segment(segment.marker(), segment.contents()) {
            Some(kind) => {
                log::debug!(
                    "  dropping {kind} segment (marker {:#04X}, {} bytes)",
                    segment.marker(),
                    segment.contents().len()
                );
                false
            }
            None => true,
        }
    });

    let (header, scans) = split_jpeg(jpeg);
    for kind in &scans.dropped {
        log::debug!("  dropping {kind} segment between scans");
    }
    if scans.trailing > 0 {
        log::debug!("  dropping {} bytes after EOI", scans.trailing);
    }

    let mut out = Vec::with_capacity(header.len() + scans.kept.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(&scans.kept);
    Some(out)
}

fn strip_png(bytes: Bytes) -> Option<Vec<u8>> {
    let mut png = match Png::from_bytes(bytes) {
        Ok(png) => png,
        Err(e) => {
            log::debug!("img-parts could not parse PNG: {e}");
            return None;
        }
    };

    png.chunks_mut().retain(|chunk| {
        match classify_png_chunk(chunk.kind(), chunk.contents()) {
            Some(kind) => {
                log::debug!(
                    "  dropping {kind} chunk {}",
                    String::from_utf8_lossy(&chunk.kind())
                );
                false
            }
            None => true,
        }
    });

    Some(png.encoder().bytes().to_vec())
}

fn strip_webp(bytes: Bytes) -> Option<Vec<u8>> {
    let mut webp = match WebP::from_bytes(bytes) {
        Ok(webp) => webp,
        Err(e) => {
            log::debug!("img-parts could not parse WebP: {e}");
            return None;
        }
    };

    // Animated WebP keeps frame 0 only, which needs a re-encode.
    if webp.chunk_by_id(CHUNK_ANIM).is_some() {
        log::debug!("Animated WebP, falling back to re-encode");
        return None;
    }

    webp.chunks_mut().retain(|chunk| match classify_webp_chunk(chunk.id()) {
        Some(kind) => {
            log::debug!("  dropping {kind} chunk");
            false
        }
        None => true,
    });

    // The extended header advertises EXIF/XMP; clear those bits.
    let header = webp
        .chunk_by_id(CHUNK_VP8X)
        .and_then(|chunk| chunk.content().data())
        .map(|data| data.to_vec());
    if let Some(mut header) = header {
        if let Some(flags) = header.first_mut() {
            *flags &= !(VP8X_EXIF_FLAG | VP8X_XMP_FLAG);
        }
        let chunks = webp.chunks_mut();
        if let Some(pos) = chunks.iter().position(|c| c.id() == CHUNK_VP8X) {
            chunks[pos] = RiffChunk::new(CHUNK_VP8X, RiffContent::Data(Bytes::from(header)));
        }
    }

    Some(webp.encoder().bytes().to_vec())
}

/// Encode a single frame with no metadata attached.
fn encode_frame(
    image: &DynamicImage,
    format: image::ImageFormat,
) -> Result<Vec<u8>, image::ImageError> {
    let prepared = prepare_for(image, format);
    let mut buffer = Cursor::new(Vec::new());

    match format {
        image::ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
            prepared.write_with_encoder(encoder)?;
        }
        image::ImageFormat::WebP => {
            let encoder = WebPEncoder::new_lossless(&mut buffer);
            prepared.write_with_encoder(encoder)?;
        }
        other => prepared.write_to(&mut buffer, other)?,
    }

    Ok(buffer.into_inner())
}

/// Convert to a colour type the target encoder accepts, borrowing when no
/// conversion is needed.
fn prepare_for(image: &DynamicImage, format: image::ImageFormat) -> Cow<'_, DynamicImage> {
    let color = image.color();
    match format {
        image::ImageFormat::Jpeg => match color {
            ColorType::L8 | ColorType::Rgb8 => Cow::Borrowed(image),
            ColorType::L16 | ColorType::La8 | ColorType::La16 => {
                Cow::Owned(DynamicImage::ImageLuma8(image.to_luma8()))
            }
            _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        },
        image::ImageFormat::Png => match color {
            ColorType::Rgb32F | ColorType::Rgba32F => {
                Cow::Owned(DynamicImage::ImageRgba16(image.to_rgba16()))
            }
            _ => Cow::Borrowed(image),
        },
        image::ImageFormat::Tiff => match color {
            ColorType::La8 => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
            ColorType::La16 => Cow::Owned(DynamicImage::ImageRgba16(image.to_rgba16())),
            _ => Cow::Borrowed(image),
        },
        image::ImageFormat::Gif => match color {
            ColorType::Rgba8 => Cow::Borrowed(image),
            _ => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
        },
        _ => match color {
            ColorType::Rgb8 | ColorType::Rgba8 => Cow::Borrowed(image),
            c if c.has_alpha() => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
            _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{MetadataKind, read_metadata};
    use crate::test_utils::{gps_exif, gradient, write_jpeg_with_metadata, write_png_with_metadata};
    use img_parts::ImageEXIF;
    use img_parts::png::PngChunk;
    use std::fs;
    use tempfile::TempDir;

    fn lossless(replace: bool) -> StripOptions {
        StripOptions {
            mode: StripMode::Lossless,
            replace,
        }
    }

    fn reencode() -> StripOptions {
        StripOptions {
            mode: StripMode::Reencode,
            replace: true,
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn u24(value: u32) -> [u8; 3] {
        let [a, b, c, _] = value.to_le_bytes();
        [a, b, c]
    }

    fn riff_chunk(id: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        if data.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    // ── lossless container stripping ─────────────────────────────────

    #[test]
    fn jpeg_metadata_removed_pixels_identical() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("photo.jpg");
        write_jpeg_with_metadata(&input, 32, 24);

        let before = read_metadata(&input).unwrap();
        assert!(before.has(MetadataKind::Exif));
        assert!(before.has(MetadataKind::Comment));

        let output = dir.path().join("out.jpg");
        let written = strip_with(&input, &output, &lossless(true)).unwrap();
        assert_eq!(written, output);

        let after = read_metadata(&output).unwrap();
        assert!(after.is_clean(), "leftover metadata: {:?}", after.blocks);
        assert!(!after.has_gps);

        let a = image::open(&input).unwrap().to_rgb8();
        let b = image::open(&output).unwrap().to_rgb8();
        assert_eq!(a.dimensions(), b.dimensions());
        assert_eq!(a.as_raw(), b.as_raw());
        assert!(fs::metadata(&output).unwrap().len() < fs::metadata(&input).unwrap().len());
    }

    #[test]
    fn png_text_and_exif_removed_pixels_identical() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("shot.png");
        write_png_with_metadata(&input, 20, 10);

        let before = read_metadata(&input).unwrap();
        assert!(before.has(MetadataKind::Text));
        assert!(before.has(MetadataKind::Exif));

        let output = dir.path().join("shot_clean.png");
        strip_with(&input, &output, &lossless(true)).unwrap();

        let after = read_metadata(&output).unwrap();
        assert!(after.is_clean(), "leftover metadata: {:?}", after.blocks);

        let a = image::open(&input).unwrap().to_rgba8();
        let b = image::open(&output).unwrap().to_rgba8();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn appended_jpeg_after_eoi_dropped() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("burst.jpg");
        write_jpeg_with_metadata(&input, 16, 12);
        let mut bytes = fs::read(&input).unwrap();
        bytes.extend(bytes.clone());
        fs::write(&input, &bytes).unwrap();

        let output = dir.path().join("burst_clean.jpg");
        strip_with(&input, &output, &lossless(true)).unwrap();

        let written = fs::read(&output).unwrap();
        assert!(!contains(&written, b"Exif\0\0"));
        assert!(!contains(&written, b"http://ns.adobe.com/xap/1.0/"));
        assert!(!contains(&written, b"shot on my phone"));
        assert_eq!(&written[written.len() - 2..], [0xFF, 0xD9]);

        let after = read_metadata(&output).unwrap();
        assert!(after.is_clean(), "leftover metadata: {:?}", after.blocks);
        let a = image::open(&input).unwrap().to_rgb8();
        let b = image::open(&output).unwrap().to_rgb8();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn webp_exif_dropped_and_header_flags_cleared() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.webp");
        let source = DynamicImage::ImageRgb8(gradient(12, 5));
        let mut buffer = Cursor::new(Vec::new());
        source
            .write_with_encoder(WebPEncoder::new_lossless(&mut buffer))
            .unwrap();
        let mut webp = WebP::from_bytes(Bytes::from(buffer.into_inner())).unwrap();
        webp.set_exif(Some(Bytes::from(gps_exif())));
        fs::write(&input, webp.encoder().bytes()).unwrap();
        assert!(read_metadata(&input).unwrap().has(MetadataKind::Exif));

        let output = dir.path().join("b.webp");
        strip_with(&input, &output, &lossless(true)).unwrap();

        let after = read_metadata(&output).unwrap();
        assert!(after.is_clean(), "leftover metadata: {:?}", after.blocks);

        let cleaned = WebP::from_bytes(Bytes::from(fs::read(&output).unwrap())).unwrap();
        assert!(!cleaned.has_chunk(*b"EXIF"));
        let header = cleaned.chunk_by_id(CHUNK_VP8X).unwrap();
        let flags = header.content().data().unwrap()[0];
        assert_eq!(flags & (VP8X_EXIF_FLAG | VP8X_XMP_FLAG), 0);
        let b = image::open(&output).unwrap().to_rgb8();
        assert_eq!(b.as_raw(), source.to_rgb8().as_raw());
    }

    #[test]
    fn apng_control_chunks_dropped() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("anim.png");
        let (width, height) = (7u32, 5u32);
        let mut buffer = Cursor::new(Vec::new());
        gradient(width, height)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();

        let mut actl = Vec::new();
        actl.extend_from_slice(&1u32.to_be_bytes());
        actl.extend_from_slice(&0u32.to_be_bytes());
        let mut fctl = Vec::new();
        for value in [0, width, height, 0, 0] {
            fctl.extend_from_slice(&value.to_be_bytes());
        }
        fctl.extend_from_slice(&[0, 0, 0, 0, 0, 0]);

        let mut png = Png::from_bytes(Bytes::from(buffer.into_inner())).unwrap();
        let chunks = png.chunks_mut();
        chunks.insert(1, PngChunk::new(*b"acTL", Bytes::from(actl)));
        let idat = chunks.iter().position(|c| c.kind() == *b"IDAT").unwrap();
        chunks.insert(idat, PngChunk::new(*b"fcTL", Bytes::from(fctl)));
        fs::write(&input, png.encoder().bytes()).unwrap();
        assert!(read_metadata(&input).unwrap().has(MetadataKind::Other));

        let output = dir.path().join("anim_clean.png");
        strip_with(&input, &output, &lossless(true)).unwrap();

        let cleaned = Png::from_bytes(Bytes::from(fs::read(&output).unwrap())).unwrap();
        assert!(cleaned.chunks().iter().all(|c| c.kind() != *b"acTL" && c.kind() != *b"fcTL"));
        let a = image::open(&input).unwrap().to_rgb8();
        let b = image::open(&output).unwrap().to_rgb8();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    // ── re-encode path ───────────────────────────────────────────────

    #[test]
    fn reencode_jpeg_keeps_dimensions() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("photo.jpg");
        write_jpeg_with_metadata(&input, 40, 30);

        let output = dir.path().join("photo_clean.jpg");
        strip_with(&input, &output, &reencode()).unwrap();

        let after = read_metadata(&output).unwrap();
        assert!(!after.has(MetadataKind::Exif));
        assert!(!after.has(MetadataKind::Comment));
        assert_eq!(after.dimensions, Some((40, 30)));
    }

    #[test]
    fn reencode_png_is_lossless() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.png");
        write_png_with_metadata(&input, 9, 7);

        let output = dir.path().join("b.png");
        strip_with(&input, &output, &reencode()).unwrap();

        let a = image::open(&input).unwrap().to_rgba8();
        let b = image::open(&output).unwrap().to_rgba8();
        assert_eq!(a.as_raw(), b.as_raw());
        assert!(read_metadata(&output).unwrap().is_clean());
    }

    #[test]
    fn output_extension_selects_format() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.png");
        write_png_with_metadata(&input, 8, 8);

        let output = dir.path().join("a.jpg");
        strip(&input, &output).unwrap();

        let format = image::ImageReader::open(&output)
            .unwrap()
            .with_guessed_format()
            .unwrap()
            .format();
        assert_eq!(format, Some(image::ImageFormat::Jpeg));
    }

    #[test]
    fn mislabelled_content_is_decoded_by_sniffing() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("really_png.jpg");
        let mut buffer = Cursor::new(Vec::new());
        gradient(6, 6)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        fs::write(&input, buffer.into_inner()).unwrap();

        let output = dir.path().join("out.jpg");
        strip(&input, &output).unwrap();
        assert_eq!(image::open(&output).unwrap().width(), 6);
    }

    #[test]
    fn webp_reencoded_losslessly() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.webp");
        let source = DynamicImage::ImageRgb8(gradient(12, 5));
        let mut buffer = Cursor::new(Vec::new());
        source
            .write_with_encoder(WebPEncoder::new_lossless(&mut buffer))
            .unwrap();
        fs::write(&input, buffer.into_inner()).unwrap();

        let output = dir.path().join("b.webp");
        strip(&input, &output).unwrap();
        let b = image::open(&output).unwrap().to_rgb8();
        assert_eq!(b.as_raw(), source.to_rgb8().as_raw());
    }

    #[test]
    fn animated_webp_keeps_first_frame() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("anim.webp");
        let (width, height) = (9u32, 6u32);
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(gradient(width, height))
            .write_with_encoder(WebPEncoder::new_lossless(&mut buffer))
            .unwrap();
        // Simple lossless file: the VP8L chunk follows the 12-byte RIFF header.
        let still = buffer.into_inner();
        let frame_chunk = &still[12..];

        let mut vp8x = vec![0x02, 0, 0, 0];
        vp8x.extend_from_slice(&u24(width - 1));
        vp8x.extend_from_slice(&u24(height - 1));
        let anim = [0u8; 6];
        let mut anmf = Vec::new();
        for value in [0, 0, width - 1, height - 1, 100] {
            anmf.extend_from_slice(&u24(value));
        }
        anmf.push(0x02);
        anmf.extend_from_slice(frame_chunk);

        let mut body = b"WEBP".to_vec();
        body.extend(riff_chunk(b"VP8X", &vp8x));
        body.extend(riff_chunk(b"ANIM", &anim));
        body.extend(riff_chunk(b"ANMF", &anmf));
        let mut file = b"RIFF".to_vec();
        file.extend_from_slice(&(body.len() as u32).to_le_bytes());
        file.extend(body);
        fs::write(&input, file).unwrap();

        let output = dir.path().join("anim_clean.webp");
        strip(&input, &output).unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (width, height));
        let cleaned = WebP::from_bytes(Bytes::from(fs::read(&output).unwrap())).unwrap();
        assert!(!cleaned.has_chunk(CHUNK_ANIM));
    }

    #[test]
    fn gif_keeps_first_frame_dimensions() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("clip.gif");
        DynamicImage::ImageRgb8(gradient(10, 4))
            .to_rgba8()
            .save(&input)
            .unwrap();

        let output = dir.path().join("clip_clean.gif");
        strip(&input, &output).unwrap();
        assert_eq!(image::image_dimensions(&output).unwrap(), (10, 4));
    }

    // ── failure paths ────────────────────────────────────────────────

    #[test]
    fn text_file_is_invalid_image() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("notes.jpg");
        fs::write(&input, b"definitely not a jpeg").unwrap();

        let output = dir.path().join("notes_clean.jpg");
        let err = strip(&input, &output).unwrap_err();
        assert!(matches!(err, StripError::InvalidImage(_)), "{err:?}");
        assert!(!output.exists());
    }

    #[test]
    fn missing_input_is_invalid_image() {
        let dir = TempDir::new().unwrap();
        let err = strip(&dir.path().join("gone.jpg"), &dir.path().join("x.jpg")).unwrap_err();
        assert!(matches!(err, StripError::InvalidImage(_)));
    }

    #[test]
    fn missing_output_dir_cannot_create_destination() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("photo.jpg");
        write_jpeg_with_metadata(&input, 4, 4);

        let output = dir.path().join("no/such/dir/photo.jpg");
        let err = strip(&input, &output).unwrap_err();
        assert!(matches!(err, StripError::CannotCreateDestination(_)), "{err:?}");
    }

    #[test]
    fn unwritable_target_format_cannot_create_destination() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("photo.jpg");
        write_jpeg_with_metadata(&input, 4, 4);

        let err = strip(&input, &dir.path().join("photo.heic")).unwrap_err();
        assert!(matches!(err, StripError::CannotCreateDestination(_)), "{err:?}");
    }

    #[test]
    fn no_clobber_leaves_existing_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("photo.jpg");
        write_jpeg_with_metadata(&input, 4, 4);

        let output = dir.path().join("taken.jpg");
        fs::write(&output, b"keep me").unwrap();

        let err = strip_with(&input, &output, &lossless(false)).unwrap_err();
        assert!(matches!(err, StripError::DestinationExists(_)), "{err:?}");
        assert_eq!(fs::read(&output).unwrap(), b"keep me");
    }

    #[test]
    fn failures_leave_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("photo.jpg");
        write_jpeg_with_metadata(&input, 4, 4);
        fs::write(dir.path().join("taken.jpg"), b"x").unwrap();

        let _ = strip_with(&input, &dir.path().join("taken.jpg"), &lossless(false));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
