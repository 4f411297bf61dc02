//! Format detection, metadata inspection, and metadata stripping.
//!
//! - [`is_supported`]: extension-based check that a path names an image
//! - [`strip`] / [`strip_with`]: write a copy of an image with its metadata removed
//! - [`read_metadata`]: report which metadata blocks an image carries
//!
//! JPEG, PNG, and still WebP files are stripped at the container level, so the
//! compressed pixel data is carried over byte for byte. Everything else (and
//! everything in [`StripMode::Reencode`](crate::config::StripMode::Reencode))
//! is decoded and re-encoded from its first frame.

mod reader;
mod writer;

pub use reader::{MetadataReport, read_metadata};
pub use writer::{JPEG_QUALITY, StripOptions, strip, strip_with};

use img_parts::Bytes;
use img_parts::jpeg::Jpeg;
use std::fmt;
use std::path::Path;

/// Image container formats recognized by extension.
///
/// Every variant counts as "supported" for input filtering. Only some can be
/// written back out; see [`ImageFormat::is_writable`].
///
/// # Example
///
/// ```rust
/// use exif_remover::codec::ImageFormat;
/// use std::path::Path;
///
/// assert_eq!(ImageFormat::from_path(Path::new("IMG_0001.JPG")), Some(ImageFormat::Jpeg));
/// assert_eq!(ImageFormat::from_path(Path::new("notes.txt")), None);
/// assert!(!ImageFormat::Heif.is_writable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Tiff,
    Bmp,
    Ico,
    Tga,
    Qoi,
    Pnm,
    /// HEIC/HEIF: recognized, but cannot be decoded or written.
    Heif,
    /// AVIF: recognized, but cannot be decoded or written.
    Avif,
    /// Camera RAW: recognized, but cannot be decoded or written.
    Raw,
}

impl ImageFormat {
    /// Determine the format from a bare extension (case-insensitive, no dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "jpe" | "jfif" => Some(Self::Jpeg),
            "png" | "apng" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            "tif" | "tiff" => Some(Self::Tiff),
            "bmp" | "dib" => Some(Self::Bmp),
            "ico" => Some(Self::Ico),
            "tga" => Some(Self::Tga),
            "qoi" => Some(Self::Qoi),
            "pnm" | "pbm" | "pgm" | "ppm" | "pam" => Some(Self::Pnm),
            "heic" | "heif" => Some(Self::Heif),
            "avif" => Some(Self::Avif),
            "cr3" | "cr2" | "dng" | "nef" | "arw" | "raf" | "orf" | "rw2" | "pef" | "srw" => {
                Some(Self::Raw)
            }
            _ => None,
        }
    }

    /// Determine the format from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_extension(path.extension()?.to_str()?)
    }

    /// Map a format sniffed from file contents by the `image` crate.
    pub(crate) fn from_sniffed(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::WebP => Some(Self::WebP),
            image::ImageFormat::Tiff => Some(Self::Tiff),
            image::ImageFormat::Bmp => Some(Self::Bmp),
            image::ImageFormat::Ico => Some(Self::Ico),
            image::ImageFormat::Tga => Some(Self::Tga),
            image::ImageFormat::Qoi => Some(Self::Qoi),
            image::ImageFormat::Pnm => Some(Self::Pnm),
            image::ImageFormat::Avif => Some(Self::Avif),
            _ => None,
        }
    }

    /// The `image` encoder for this format, if one exists.
    pub(crate) fn encoder_format(&self) -> Option<image::ImageFormat> {
        match self {
            Self::Jpeg => Some(image::ImageFormat::Jpeg),
            Self::Png => Some(image::ImageFormat::Png),
            Self::Gif => Some(image::ImageFormat::Gif),
            Self::WebP => Some(image::ImageFormat::WebP),
            Self::Tiff => Some(image::ImageFormat::Tiff),
            Self::Bmp => Some(image::ImageFormat::Bmp),
            Self::Ico => Some(image::ImageFormat::Ico),
            Self::Tga => Some(image::ImageFormat::Tga),
            Self::Qoi => Some(image::ImageFormat::Qoi),
            Self::Pnm => Some(image::ImageFormat::Pnm),
            Self::Heif | Self::Avif | Self::Raw => None,
        }
    }

    /// Whether stripped output can be written in this format.
    pub fn is_writable(&self) -> bool {
        self.encoder_format().is_some()
    }

    /// MIME type, as shown by `--show-metadata`.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
            Self::Ico => "image/x-icon",
            Self::Tga => "image/x-tga",
            Self::Qoi => "image/qoi",
            Self::Pnm => "image/x-portable-anymap",
            Self::Heif => "image/heif",
            Self::Avif => "image/avif",
            Self::Raw => "image/x-raw",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::WebP => "WebP",
            Self::Tiff => "TIFF",
            Self::Bmp => "BMP",
            Self::Ico => "ICO",
            Self::Tga => "TGA",
            Self::Qoi => "QOI",
            Self::Pnm => "PNM",
            Self::Heif => "HEIF",
            Self::Avif => "AVIF",
            Self::Raw => "RAW",
        };
        f.write_str(name)
    }
}

/// Kinds of auxiliary blocks that get removed from a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    /// EXIF/TIFF directory (camera settings, GPS, maker notes).
    Exif,
    /// XMP packet, including extended XMP.
    Xmp,
    /// IPTC-IIM or other Photoshop image resources.
    Iptc,
    /// JPEG COM segment.
    Comment,
    /// PNG textual chunks.
    Text,
    /// Anything else that is not needed to render the pixels.
    Other,
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exif => "EXIF",
            Self::Xmp => "XMP",
            Self::Iptc => "IPTC",
            Self::Comment => "comment",
            Self::Text => "text",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

const EXIF_PREFIX: &[u8] = b"Exif\0\0";
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const XMP_EXTENSION_HEADER: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
const IPTC_HEADER: &[u8] = b"Photoshop 3.0\0";
const ICC_HEADER: &[u8] = b"ICC_PROFILE\0";
const PNG_XMP_KEYWORD: &[u8] = b"XML:com.adobe.xmp\0";

/// PNG ancillary chunks that affect how pixels render and are always kept.
const PNG_RENDERING_CHUNKS: &[[u8; 4]] = &[
    *b"tRNS", *b"gAMA", *b"cHRM", *b"sRGB", *b"iCCP", *b"sBIT", *b"bKGD", *b"cICP", *b"mDCv",
    *b"cLLi",
];

/// Classify a JPEG segment. `None` means the segment must be kept.
///
/// APP0 (JFIF), APP14 (Adobe colour transform), and the ICC profile in APP2
/// stay because decoders need them to reproduce the same pixels.
pub(crate) fn classify_jpeg_segment(marker: u8, contents: &[u8]) -> Option<MetadataKind> {
    match marker {
        0xE1 if contents.starts_with(EXIF_PREFIX) => Some(MetadataKind::Exif),
        0xE1 if contents.starts_with(XMP_HEADER) || contents.starts_with(XMP_EXTENSION_HEADER) => {
            Some(MetadataKind::Xmp)
        }
        0xE1 => Some(MetadataKind::Other),
        0xE2 if contents.starts_with(ICC_HEADER) => None,
        // MPF, FlashPix
        0xE2 => Some(MetadataKind::Other),
        0xED if contents.starts_with(IPTC_HEADER) => Some(MetadataKind::Iptc),
        0xE3..=0xED | 0xEF => Some(MetadataKind::Other),
        0xFE => Some(MetadataKind::Comment),
        _ => None,
    }
}

/// Classify a PNG chunk. `None` means the chunk must be kept.
///
/// Critical chunks (uppercase first letter) and colour-rendering ancillaries
/// are kept; APNG animation chunks fall through to `Other`, leaving only the
/// default image.
pub(crate) fn classify_png_chunk(kind: [u8; 4], contents: &[u8]) -> Option<MetadataKind> {
    if kind[0].is_ascii_uppercase() || PNG_RENDERING_CHUNKS.contains(&kind) {
        return None;
    }
    match &kind {
        b"eXIf" => Some(MetadataKind::Exif),
        b"iTXt" if contents.starts_with(PNG_XMP_KEYWORD) => Some(MetadataKind::Xmp),
        b"tEXt" | b"zTXt" | b"iTXt" => Some(MetadataKind::Text),
        _ => Some(MetadataKind::Other),
    }
}

/// Classify a WebP RIFF chunk. `None` means the chunk must be kept.
pub(crate) fn classify_webp_chunk(id: [u8; 4]) -> Option<MetadataKind> {
    match &id {
        b"EXIF" => Some(MetadataKind::Exif),
        b"XMP " => Some(MetadataKind::Xmp),
        _ => None,
    }
}

/// Scan data of a JPEG, from the end of the first SOS header to the end of
/// the file, with metadata removed.
#[derive(Debug, Default)]
pub(crate) struct JpegScans {
    /// Entropy-coded data and the table/scan segments between scans, up to
    /// and including EOI.
    pub(crate) kept: Vec<u8>,
    /// Metadata segments found between scans, in file order.
    pub(crate) dropped: Vec<MetadataKind>,
    /// Bytes after EOI (appended images, vendor trailers).
    pub(crate) trailing: usize,
}

/// Split the bytes after the first SOS header into what a decoder needs and
/// what it does not.
///
/// Inside entropy-coded data `FF` is always followed by a stuffed `00` or an
/// RSTn marker, so any other `FF xx` pair is a real marker.
pub(crate) fn split_jpeg_scans(data: &[u8]) -> JpegScans {
    let mut scans = JpegScans {
        kept: Vec::with_capacity(data.len()),
        ..Default::default()
    };
    let mut copied = 0;
    let mut pos = 0;

    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        match data[pos + 1] {
            // stuffed byte, restart marker, fill byte
            0x00 | 0xD0..=0xD7 | 0xFF => pos += 1,
            // TEM and SOI have no length
            0x01 | 0xD8 => pos += 2,
            0xD9 => {
                let end = pos + 2;
                scans.kept.extend_from_slice(&data[copied..end]);
                scans.trailing = data.len() - end;
                return scans;
            }
            marker => {
                if pos + 4 > data.len() {
                    break;
                }
                let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                let end = pos + 2 + length;
                if length < 2 || end > data.len() {
                    break;
                }
                if let Some(kind) = classify_jpeg_segment(marker, &data[pos + 4..end]) {
                    scans.kept.extend_from_slice(&data[copied..pos]);
                    scans.dropped.push(kind);
                    copied = end;
                }
                pos = end;
            }
        }
    }

    // Truncated or no EOI: keep what is there.
    scans.kept.extend_from_slice(&data[copied..]);
    scans
}

/// Encode `jpeg` and split it at the end of its first SOS header.
///
/// img-parts stops parsing at the first scan and keeps the rest of the file
/// (later scans, EOI, anything appended) as opaque entropy data; this walks it.
pub(crate) fn split_jpeg(jpeg: Jpeg) -> (Bytes, JpegScans) {
    let header_len = 2 + jpeg.segments().iter().map(|s| s.len()).sum::<usize>();
    let encoded = jpeg.encoder().bytes();
    let header_len = header_len.min(encoded.len());
    let scans = split_jpeg_scans(&encoded[header_len..]);
    (encoded.slice(..header_len), scans)
}

/// Check if a path names a supported image, judged by extension.
///
/// This is a cheap type check: a text file renamed to `.jpg` passes here and
/// fails later in [`strip`] with [`StripError::InvalidImage`](crate::StripError::InvalidImage).
pub fn is_supported(path: &Path) -> bool {
    ImageFormat::from_path(path).is_some()
}
