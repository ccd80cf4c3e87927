//! Shared test utilities: synthetic images encoded in memory.
//!
//! Real codecs need real pixels. Every test image is generated
//! deterministically here instead of living in checked-in fixtures.
//!
//! - [`gradient_png`]: smooth RGB gradient, compresses very well.
//! - [`noisy_rgba_png`]: seeded pseudo-random RGBA noise, compresses badly,
//!   so JPEG size clearly grows with quality.

use image::{ImageEncoder, RgbImage, RgbaImage};
use std::path::Path;

/// Encode an RGB gradient as PNG bytes.
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// Encode seeded RGBA noise as PNG bytes. Same seed, same bytes.
pub fn noisy_rgba_png(width: u32, height: u32, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    let img = RgbaImage::from_fn(width, height, |_, _| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let [r, g, b, _, _, _, _, _] = state.to_be_bytes();
        image::Rgba([r, g, b, 255])
    });
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    out
}

/// Write `bytes` to `dir/name`, creating parent directories.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}
