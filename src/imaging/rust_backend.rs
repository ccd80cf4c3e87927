//! Pure Rust encoding backend, no system libraries.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` (pure Rust decoders) |
//! | Identify | `image::ImageReader::into_dimensions` (header only, no full decode) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` on RGB8 |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) on RGB8/RGBA8 |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{OutputFormat, Quality};
use super::source::SourceImage;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};
use std::io::Cursor;
use std::sync::LazyLock;

/// rav1e speed preset: 1 is slowest/best, 10 fastest. The search encodes
/// several times per image, so favour throughput.
const AVIF_SPEED: u8 = 6;

/// Extensions whose decoders are compiled in.
///
/// AVIF is deliberately absent: the `image` crate's `"avif"` feature only
/// enables the **encoder**. AVIF is an output format here, never an input.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, BackendError> {
    // JPEG has no alpha channel; flatten everything to 8-bit RGB.
    let rgb = img.to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {}", e)))?;
    Ok(buffer.into_inner())
}

fn encode_avif(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, BackendError> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = AvifEncoder::new_with_speed_quality(&mut buffer, AVIF_SPEED, quality);
    let result = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        encoder.write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            ExtendedColorType::Rgba8,
        )
    } else {
        let rgb = img.to_rgb8();
        encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
    };
    result.map_err(|e| BackendError::Encode(format!("AVIF encode failed: {}", e)))?;
    Ok(buffer.into_inner())
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &SourceImage) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(source.bytes()))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {}", e)))?;
        Ok(Dimensions { width, height })
    }

    fn encode(
        &self,
        source: &SourceImage,
        quality: Quality,
        format: OutputFormat,
    ) -> Result<Vec<u8>, BackendError> {
        let img = source.decoded()?;
        let q = quality.value() as u8;
        match format {
            OutputFormat::Jpeg => encode_jpeg(img, q),
            OutputFormat::Avif => encode_avif(img, q),
        }
    }
}
