//! Image encoding in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Decode** | `image::load_from_memory`, cached per [`SourceImage`] |
//! | **Encode → JPEG** | `JpegEncoder::new_with_quality` |
//! | **Encode → AVIF** | `AvifEncoder::new_with_speed_quality` (rav1e) |
//!
//! The module is split into:
//! - **Parameters**: Quality, ranges, formats, and byte budgets
//! - **Source**: The immutable input image with its lazy decode cache
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod params;
pub mod rust_backend;
mod source;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use params::{
    ByteSize, KB, MB, OutputFormat, ParamError, Quality, QualityRange, SearchParams,
};
pub use rust_backend::{RustBackend, supported_input_extensions};
pub use source::SourceImage;
