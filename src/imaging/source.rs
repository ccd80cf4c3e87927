//! The image being searched over.
//!
//! A [`SourceImage`] owns the caller's original bytes. They are never
//! modified: when no quality fits the budget the search hands these exact
//! bytes back. Backends that work on pixels decode once through
//! [`SourceImage::decoded`]; the result is cached in a `OnceLock`, so a
//! single source can be searched from several threads at once.

use super::backend::BackendError;
use image::DynamicImage;
use std::path::Path;
use std::sync::OnceLock;

pub struct SourceImage {
    bytes: Vec<u8>,
    decoded: OnceLock<DynamicImage>,
}

impl SourceImage {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            decoded: OnceLock::new(),
        }
    }

    /// Read a source image from disk. Decoding is deferred to the first encode.
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        Ok(Self::new(std::fs::read(path)?))
    }

    /// The original, untouched input.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Decoded pixels, decoding on first use.
    ///
    /// Two threads racing on the first call may both decode; only one result
    /// is kept.
    pub fn decoded(&self) -> Result<&DynamicImage, BackendError> {
        if let Some(img) = self.decoded.get() {
            return Ok(img);
        }
        if self.bytes.is_empty() {
            return Err(BackendError::Decode("empty input".into()));
        }
        let img = image::load_from_memory(&self.bytes)
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(self.decoded.get_or_init(|| img))
    }
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("len", &self.bytes.len())
            .field("decoded", &self.decoded.get().is_some())
            .finish()
    }
}
