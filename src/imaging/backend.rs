//! Image encoding backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the encoder collaborator the quality search
//! is written against: given a source image, a quality, and an output
//! format, produce encoded bytes. The search only ever measures the length
//! of what comes back, so any codec binding can sit behind it.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image` crate's
//! pure-Rust JPEG and AVIF encoders. Tests use the recording
//! [`MockBackend`](tests::MockBackend) with a synthetic size curve.

use super::params::{OutputFormat, Quality};
use super::source::SourceImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image encoding backends.
///
/// `Sync` so one backend can serve searches running on rayon workers.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, source: &SourceImage) -> Result<Dimensions, BackendError>;

    /// Encode `source` at `quality` in `format`, returning the encoded bytes.
    fn encode(
        &self,
        source: &SourceImage,
        quality: Quality,
        format: OutputFormat,
    ) -> Result<Vec<u8>, BackendError>;
}
