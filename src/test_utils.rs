//! Fixture images for unit tests.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::png::{Png, PngChunk};
use img_parts::{Bytes, ImageEXIF};
use std::io::Cursor;
use std::path::Path;

const XMP_PACKET: &[u8] = b"http://ns.adobe.com/xap/1.0/\0<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>";

/// A deterministic colour gradient.
pub(crate) fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) * 3 % 256) as u8])
    })
}

/// Little-endian TIFF payload with an IFD0 pointing at a GPS IFD
/// (48°51'29.58"N, 2°17'40.20"E).
pub(crate) fn gps_exif() -> Vec<u8> {
    fn entry(out: &mut Vec<u8>, tag: u16, format: u16, count: u32, value: [u8; 4]) {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&format.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&value);
    }
    fn rational(out: &mut Vec<u8>, num: u32, den: u32) {
        out.extend_from_slice(&num.to_le_bytes());
        out.extend_from_slice(&den.to_le_bytes());
    }

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II*\0");
    tiff.extend_from_slice(&8u32.to_le_bytes());

    // IFD0 at 8: GPSInfo pointer only
    tiff.extend_from_slice(&1u16.to_le_bytes());
    entry(&mut tiff, 0x8825, 4, 1, 26u32.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());

    // GPS IFD at 26, values at 80 and 104
    tiff.extend_from_slice(&4u16.to_le_bytes());
    entry(&mut tiff, 0x0001, 2, 2, *b"N\0\0\0");
    entry(&mut tiff, 0x0002, 5, 3, 80u32.to_le_bytes());
    entry(&mut tiff, 0x0003, 2, 2, *b"E\0\0\0");
    entry(&mut tiff, 0x0004, 5, 3, 104u32.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());

    rational(&mut tiff, 48, 1);
    rational(&mut tiff, 51, 1);
    rational(&mut tiff, 2958, 100);
    rational(&mut tiff, 2, 1);
    rational(&mut tiff, 17, 1);
    rational(&mut tiff, 4020, 100);
    tiff
}

/// Write a JPEG carrying EXIF (with GPS), XMP, and a comment.
pub(crate) fn write_jpeg_with_metadata(path: &Path, width: u32, height: u32) {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, 90))
        .unwrap();

    let mut jpeg = Jpeg::from_bytes(Bytes::from(buffer.into_inner())).unwrap();
    jpeg.set_exif(Some(Bytes::from(gps_exif())));
    let segments = jpeg.segments_mut();
    let at = segments.len().min(2);
    segments.insert(at, JpegSegment::new_with_contents(0xE1, Bytes::from_static(XMP_PACKET)));
    let comment = Bytes::from_static(b"shot on my phone");
    segments.insert(at, JpegSegment::new_with_contents(0xFE, comment));

    std::fs::write(path, jpeg.encoder().bytes()).unwrap();
}

/// Write a PNG carrying an eXIf chunk (with GPS) and a tEXt chunk.
pub(crate) fn write_png_with_metadata(path: &Path, width: u32, height: u32) {
    let mut buffer = Cursor::new(Vec::new());
    gradient(width, height)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();

    let mut png = Png::from_bytes(Bytes::from(buffer.into_inner())).unwrap();
    png.set_exif(Some(Bytes::from(gps_exif())));
    png.chunks_mut().insert(
        1,
        PngChunk::new(*b"tEXt", Bytes::from_static(b"Author\0Jane Doe")),
    );

    std::fs::write(path, png.encoder().bytes()).unwrap();
}
