//! Parameter types for the quality search.
//!
//! These types describe *what* to encode, not *how*. They are the interface
//! between the [`search`](crate::search) (which decides which qualities to
//! try) and the [`backend`](super::backend) (which does the pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`QualityRange`]: Closed `[min, max]` quality interval searched (default 10–100).
//! - [`OutputFormat`]: Lossy output codec (JPEG or AVIF).
//! - [`ByteSize`]: Positive byte budget, parsed from `"150kb"`, `"1.5MB"`, presets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use thiserror::Error;

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("quality range {min}-{max} is invalid: bounds must satisfy 1 <= min <= max <= 100")]
    InvalidRange { min: u32, max: u32 },
    #[error("invalid size '{0}': expected a preset or a number with an optional unit (b, kb, mb)")]
    InvalidSize(String),
    #[error("size must be greater than zero")]
    ZeroSize,
    #[error("unsupported output format '{0}': expected jpeg or avif")]
    UnknownFormat(String),
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(pub u32);

impl Quality {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;

    pub fn new(value: u32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Inclusive range of qualities the search may try.
///
/// Both bounds lie in `1..=100` and `min <= max`; a single-value range is
/// allowed and costs exactly one encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityRange {
    min: u32,
    max: u32,
}

impl QualityRange {
    pub fn new(min: u32, max: u32) -> Result<Self, ParamError> {
        if min < Quality::MIN || max > Quality::MAX || min > max {
            return Err(ParamError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(self) -> u32 {
        self.min
    }

    pub fn max(self) -> u32 {
        self.max
    }

    /// Number of distinct quality levels in the range.
    pub fn levels(self) -> u32 {
        self.max - self.min + 1
    }

    /// Upper bound on backend calls a binary search over this range makes:
    /// `floor(log2(levels)) + 1`.
    pub fn max_probes(self) -> u32 {
        self.levels().ilog2() + 1
    }
}

impl Default for QualityRange {
    fn default() -> Self {
        Self { min: 10, max: 100 }
    }
}

impl fmt::Display for QualityRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Lossy codec used for encoding candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Avif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Avif => "avif",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Avif => "avif",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "avif" => Ok(Self::Avif),
            other => Err(ParamError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A positive number of bytes; the budget an encoded image must fit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(NonZeroU64);

impl ByteSize {
    pub fn new(bytes: u64) -> Result<Self, ParamError> {
        NonZeroU64::new(bytes).map(Self).ok_or(ParamError::ZeroSize)
    }

    pub const fn kb(n: u64) -> Self {
        Self::from_const(n * KB)
    }

    pub const fn mb(n: u64) -> Self {
        Self::from_const(n * MB)
    }

    const fn from_const(bytes: u64) -> Self {
        match NonZeroU64::new(bytes) {
            Some(n) => Self(n),
            None => panic!("byte size constants must be non-zero"),
        }
    }

    pub fn bytes(self) -> u64 {
        self.0.get()
    }

    /// Whether a buffer of `len` bytes fits within this budget.
    pub fn fits(self, len: usize) -> bool {
        len as u64 <= self.bytes()
    }

    /// Parse a preset name (`"100kb"`) or a size such as `"2048"`, `"150 KB"`,
    /// `"1.5mb"`. Units are binary: 1 KB = 1024 bytes.
    pub fn parse(text: &str) -> Result<Self, ParamError> {
        let trimmed = text.trim();
        if let Some(preset) = crate::presets::find(trimmed) {
            return Ok(preset);
        }
        let lower = trimmed.to_ascii_lowercase();
        let split = lower
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(lower.len());
        let (number, unit) = lower.split_at(split);
        let multiplier = match unit.trim() {
            "" | "b" => 1,
            "k" | "kb" => KB,
            "m" | "mb" => MB,
            _ => return Err(ParamError::InvalidSize(text.to_string())),
        };
        if number.is_empty() {
            return Err(ParamError::InvalidSize(text.to_string()));
        }
        let bytes = if multiplier == 1 {
            number
                .parse::<u64>()
                .map_err(|_| ParamError::InvalidSize(text.to_string()))?
        } else {
            let value: f64 = number
                .parse()
                .map_err(|_| ParamError::InvalidSize(text.to_string()))?;
            (value * multiplier as f64).round() as u64
        };
        Self::new(bytes)
    }

    /// Lowercase label used in output filenames, e.g. `100kb`, `2mb`, `1536b`.
    pub fn label(self) -> String {
        self.to_string().to_ascii_lowercase()
    }
}

impl FromStr for ByteSize {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.bytes();
        if bytes % MB == 0 {
            write!(f, "{}MB", bytes / MB)
        } else if bytes % KB == 0 {
            write!(f, "{}KB", bytes / KB)
        } else {
            write!(f, "{}B", bytes)
        }
    }
}

/// Everything one search needs besides the image itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    pub target: ByteSize,
    pub format: OutputFormat,
    pub range: QualityRange,
}

impl SearchParams {
    /// JPEG over the default 10–100 range.
    pub fn new(target: ByteSize) -> Self {
        Self {
            target,
            format: OutputFormat::default(),
            range: QualityRange::default(),
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_range(mut self, range: QualityRange) -> Self {
        self.range = range;
        self
    }
}
