//! Target-size compression: binary search over encoder quality.
//!
//! Given a source image and a byte budget, find the highest quality whose
//! encoded output still fits. Trying every quality from the top down costs
//! up to one full re-encode per level; bisecting the range costs at most
//! `floor(log2(levels)) + 1` encodes (7 for the default 10–100 range).
//!
//! ```text
//! low = min, high = max, best = original
//! while low <= high:
//!     mid = (low + high) / 2
//!     candidate = encode(source, mid)
//!     if len(candidate) <= target: best = candidate; low = mid + 1
//!     else:                        high = mid - 1
//! ```
//!
//! ## Monotonicity
//!
//! The search assumes output size never decreases as quality rises. Real
//! encoders mostly behave this way but are not guaranteed to (chroma
//! subsampling switches, codec heuristics). With a non-monotonic encoder the
//! search still terminates and still returns either a buffer that fits or
//! the original, but the quality found may not be the global maximum.
//!
//! Every fit moves `low` above `mid`, so later probes are all higher than
//! the recorded best: the result is always the highest fitting quality the
//! search actually tried.
//!
//! ## Unreachable budgets
//!
//! If no tried quality fits (the last probe is then always `min`), the
//! original input bytes come back unchanged and [`SearchOutcome::quality`]
//! is `None`. This is not an error; callers that need strict enforcement
//! check [`SearchOutcome::fits_budget`].
//!
//! Backend errors are returned as-is, on the first failure, with no retry.

use crate::imaging::{BackendError, ByteSize, ImageBackend, Quality, SearchParams, SourceImage};

/// What a search produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// The encoding at [`quality`](Self::quality), or the original input
    /// when the budget was unreachable.
    pub buffer: Vec<u8>,
    /// Highest quality found to fit; `None` means nothing fit.
    pub quality: Option<Quality>,
    /// Number of backend encode calls made.
    pub encodes: u32,
}

impl SearchOutcome {
    pub fn fits_budget(&self) -> bool {
        self.quality.is_some()
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Find the highest quality in `params.range` whose encoding fits `params.target`.
pub fn find_best_quality(
    backend: &impl ImageBackend,
    source: &SourceImage,
    params: &SearchParams,
) -> Result<SearchOutcome, BackendError> {
    let target = params.target;
    let mut low = params.range.min();
    let mut high = params.range.max();
    let mut best: Option<(Vec<u8>, Quality)> = None;
    let mut encodes = 0;

    while low <= high {
        let mid = low + (high - low) / 2;
        let quality = Quality::new(mid);
        let candidate = backend.encode(source, quality, params.format)?;
        encodes += 1;

        let fits = target.fits(candidate.len());
        tracing::debug!(
            quality = mid,
            size = candidate.len(),
            target = target.bytes(),
            fits,
            "probe"
        );

        if fits {
            best = Some((candidate, quality));
            low = mid + 1;
        } else {
            // `mid >= min >= 1`, so this cannot underflow.
            high = mid - 1;
        }
    }

    let outcome = match best {
        Some((buffer, quality)) => {
            tracing::info!(
                quality = quality.value(),
                size = buffer.len(),
                target = target.bytes(),
                encodes,
                "budget met"
            );
            SearchOutcome {
                buffer,
                quality: Some(quality),
                encodes,
            }
        }
        None => {
            tracing::warn!(
                target = target.bytes(),
                min_quality = params.range.min(),
                encodes,
                "budget unreachable, returning original"
            );
            SearchOutcome {
                buffer: source.bytes().to_vec(),
                quality: None,
                encodes,
            }
        }
    };
    Ok(outcome)
}

/// Bytes-only form: JPEG over qualities 10–100, best effort.
///
/// The result may be larger than `target` when even the lowest quality
/// overshoots; it is then the original input.
pub fn compress_to_size(
    backend: &impl ImageBackend,
    source: &SourceImage,
    target: ByteSize,
) -> Result<Vec<u8>, BackendError> {
    find_best_quality(backend, source, &SearchParams::new(target)).map(SearchOutcome::into_bytes)
}
