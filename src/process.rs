//! Batch compression.
//!
//! Runs the quality search over every input image and writes the results
//! into one output directory.
//!
//! ## Output Naming
//!
//! Each input `<stem>.<ext>` produces `<stem>-<label>.<out>`, where `label`
//! is the target size (`100kb`, `2mb`) and `out` depends on the outcome:
//!
//! ```text
//! compressed/
//! ├── .cache-manifest.json
//! ├── dawn-100kb.jpg          # budget met: encoded in the output format
//! ├── scan-100kb.png          # budget unreachable: original bytes, original extension
//! └── dawn-2-100kb.jpg        # second input with the stem "dawn"
//! ```
//!
//! When the budget can't be met the search hands back the original file,
//! so it keeps its own extension. With `strict` enabled that case is an
//! error instead and nothing is written for the image.
//!
//! ## Parallel Processing
//!
//! Images are processed in parallel using [rayon](https://docs.rs/rayon);
//! each search itself stays sequential. Progress events are sent over an
//! optional channel as each image finishes, so they arrive out of order
//! and carry the input's index. The returned report keeps input order.

use crate::cache::{self, CacheEntry, CacheManifest, CacheStats};
use crate::imaging::{
    BackendError, ByteSize, Dimensions, ImageBackend, OutputFormat, RustBackend, SearchParams,
    SourceImage,
};
use crate::search::find_best_quality;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image processing failed for {path}: {source}")]
    Imaging {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("Cannot fit {path} into {target}: even quality {min_quality} is too large")]
    BudgetUnreachable {
        path: PathBuf,
        target: ByteSize,
        min_quality: u32,
    },
    #[error("Input has no usable file name: {0}")]
    InvalidInput(PathBuf),
}

/// Configuration for a batch run.
#[derive(Debug, Clone, Copy)]
pub struct ProcessConfig {
    pub params: SearchParams,
    /// Fail instead of keeping the original when nothing fits.
    pub strict: bool,
}

impl ProcessConfig {
    pub fn new(params: SearchParams) -> Self {
        Self {
            params,
            strict: false,
        }
    }
}

/// How an output file came to exist on this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStatus {
    /// Unchanged since the last run.
    Cached,
    /// Same content as a cached output under another name; copied.
    Copied,
    /// Quality search ran.
    Searched,
}

/// Progress events sent while processing.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    Started {
        total: usize,
        target: ByteSize,
        format: OutputFormat,
    },
    ImageProcessed {
        /// 1-based position in the input list.
        index: usize,
        entry: ReportEntry,
    },
}

/// One line of `report.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub source: String,
    /// Path relative to the output directory.
    pub output: String,
    pub original_bytes: u64,
    pub output_bytes: u64,
    /// Quality chosen; `None` when the original was kept.
    pub quality: Option<u32>,
    pub fits_budget: bool,
    pub status: OutputStatus,
}

/// Summary of a batch run, serialized as `report.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub target: String,
    pub target_bytes: u64,
    pub format: OutputFormat,
    pub min_quality: u32,
    pub max_quality: u32,
    pub images: Vec<ReportEntry>,
}

impl Report {
    pub fn fitted(&self) -> usize {
        self.images.iter().filter(|e| e.fits_budget).count()
    }

    pub fn kept_original(&self) -> usize {
        self.images.len() - self.fitted()
    }

    pub fn original_bytes(&self) -> u64 {
        self.images.iter().map(|e| e.original_bytes).sum()
    }

    pub fn output_bytes(&self) -> u64 {
        self.images.iter().map(|e| e.output_bytes).sum()
    }
}

pub struct ProcessResult {
    pub report: Report,
    pub cache_stats: CacheStats,
}

/// Dimensions and size of one input, for `check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputInfo {
    pub path: PathBuf,
    pub dimensions: Dimensions,
    pub bytes: u64,
}

pub fn process(
    inputs: &[PathBuf],
    output_dir: &Path,
    config: &ProcessConfig,
    use_cache: bool,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    let backend = RustBackend::new();
    process_with_backend(&backend, inputs, output_dir, config, use_cache, progress)
}

/// Process images using a specific backend (allows testing with mock).
pub fn process_with_backend(
    backend: &impl ImageBackend,
    inputs: &[PathBuf],
    output_dir: &Path,
    config: &ProcessConfig,
    use_cache: bool,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    std::fs::create_dir_all(output_dir)?;

    let manifest = if use_cache {
        CacheManifest::load(output_dir)
    } else {
        CacheManifest::empty()
    };
    let cache = Mutex::new(manifest);
    let stats = Mutex::new(CacheStats::default());
    let params_hash = cache::hash_search_params(&config.params);
    let stems = plan_output_stems(inputs)?;

    if let Some(tx) = &progress {
        tx.send(ProcessEvent::Started {
            total: inputs.len(),
            target: config.params.target,
            format: config.params.format,
        })
        .ok();
    }

    let ctx = ImageContext {
        backend,
        output_dir,
        config,
        params_hash: &params_hash,
        cache: &cache,
    };

    let images = inputs
        .par_iter()
        .zip(stems.par_iter())
        .enumerate()
        .map(|(i, (path, stem))| {
            let entry = ctx.process_one(path, stem)?;
            {
                let mut stats = stats.lock().unwrap_or_else(PoisonError::into_inner);
                match entry.status {
                    OutputStatus::Cached => stats.hit(),
                    OutputStatus::Copied => stats.copy(),
                    OutputStatus::Searched => stats.miss(),
                }
            }
            if let Some(tx) = &progress {
                tx.send(ProcessEvent::ImageProcessed {
                    index: i + 1,
                    entry: entry.clone(),
                })
                .ok();
            }
            Ok(entry)
        })
        .collect::<Result<Vec<_>, ProcessError>>()?;

    cache
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .save(output_dir)?;

    let params = config.params;
    Ok(ProcessResult {
        report: Report {
            target: params.target.to_string(),
            target_bytes: params.target.bytes(),
            format: params.format,
            min_quality: params.range.min(),
            max_quality: params.range.max(),
            images,
        },
        cache_stats: stats.into_inner().unwrap_or_else(PoisonError::into_inner),
    })
}

/// Read dimensions and sizes without encoding anything.
pub fn inspect(
    backend: &impl ImageBackend,
    inputs: &[PathBuf],
) -> Result<Vec<InputInfo>, ProcessError> {
    inputs
        .iter()
        .map(|path| {
            let source = SourceImage::open(path).map_err(|source| ProcessError::Imaging {
                path: path.clone(),
                source,
            })?;
            let dimensions = backend
                .identify(&source)
                .map_err(|source| ProcessError::Imaging {
                    path: path.clone(),
                    source,
                })?;
            Ok(InputInfo {
                path: path.clone(),
                dimensions,
                bytes: source.len() as u64,
            })
        })
        .collect()
}

/// Pick a unique output stem for each input.
///
/// Inputs keep their own stem when no earlier input claimed it. Repeats get
/// the first free `-2`, `-3`, … suffix, skipping stems that other inputs
/// carry literally, so `dawn-2.png` next to two `dawn.jpg` files still gives
/// three distinct outputs.
fn plan_output_stems(inputs: &[PathBuf]) -> Result<Vec<String>, ProcessError> {
    let natural = inputs
        .iter()
        .map(|path| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ProcessError::InvalidInput(path.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut taken: HashSet<String> = HashSet::new();
    let claimed: Vec<bool> = natural
        .iter()
        .map(|stem| taken.insert(stem.to_string()))
        .collect();

    Ok(natural
        .iter()
        .zip(claimed)
        .map(|(stem, own)| {
            if own {
                return stem.to_string();
            }
            (2..)
                .map(|n| format!("{}-{}", stem, n))
                .find(|candidate| taken.insert(candidate.clone()))
                .unwrap_or_else(|| stem.to_string())
        })
        .collect())
}

fn output_name(stem: &str, target: ByteSize, extension: &str) -> String {
    format!("{}-{}.{}", stem, target.label(), extension)
}

fn input_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

/// Shared, read-mostly state for processing one image.
struct ImageContext<'a, B> {
    backend: &'a B,
    output_dir: &'a Path,
    config: &'a ProcessConfig,
    params_hash: &'a str,
    cache: &'a Mutex<CacheManifest>,
}

impl<B: ImageBackend> ImageContext<'_, B> {
    fn process_one(&self, path: &Path, stem: &str) -> Result<ReportEntry, ProcessError> {
        let params = self.config.params;
        let bytes = std::fs::read(path)?;
        let original_bytes = bytes.len() as u64;
        let source_hash = cache::hash_bytes(&bytes);

        if let Some(entry) = self.reuse_cached(path, stem, &source_hash, original_bytes)? {
            return Ok(entry);
        }

        let source = SourceImage::new(bytes);
        let outcome = find_best_quality(self.backend, &source, &params).map_err(|source| {
            ProcessError::Imaging {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let extension = if outcome.fits_budget() {
            params.format.extension().to_string()
        } else {
            self.check_strict(path)?;
            input_extension(path)
        };
        let output = output_name(stem, params.target, &extension);
        let quality = outcome.quality.map(|q| q.value());

        // File and manifest entry change under one lock, so a copy from this
        // path always sees the content its entry names.
        {
            let mut cache = self.lock_cache();
            std::fs::write(self.output_dir.join(&output), &outcome.buffer)?;
            cache.insert(output.clone(), self.cache_entry(source_hash, quality));
        }

        Ok(ReportEntry {
            source: path.display().to_string(),
            output,
            original_bytes,
            output_bytes: outcome.size() as u64,
            quality,
            fits_budget: quality.is_some(),
            status: OutputStatus::Searched,
        })
    }

    /// Serve the image from the cache, copying under the new name if needed.
    ///
    /// Runs entirely under the manifest lock: the copied file is exactly the
    /// content the matching entry describes.
    fn reuse_cached(
        &self,
        path: &Path,
        stem: &str,
        source_hash: &str,
        original_bytes: u64,
    ) -> Result<Option<ReportEntry>, ProcessError> {
        let mut cache = self.lock_cache();
        let Some(hit) = cache.find_cached(source_hash, self.params_hash, self.output_dir) else {
            return Ok(None);
        };
        if hit.quality.is_none() {
            self.check_strict(path)?;
        }

        let extension = Path::new(&hit.output_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_string();
        let output = output_name(stem, self.config.params.target, &extension);
        let status = if hit.output_path == output {
            OutputStatus::Cached
        } else {
            std::fs::copy(
                self.output_dir.join(&hit.output_path),
                self.output_dir.join(&output),
            )?;
            OutputStatus::Copied
        };
        tracing::debug!(source = %path.display(), %output, ?status, "cache hit");

        cache.insert(
            output.clone(),
            self.cache_entry(source_hash.to_string(), hit.quality),
        );
        let output_bytes = std::fs::metadata(self.output_dir.join(&output))?.len();

        Ok(Some(ReportEntry {
            source: path.display().to_string(),
            output,
            original_bytes,
            output_bytes,
            quality: hit.quality,
            fits_budget: hit.quality.is_some(),
            status,
        }))
    }

    fn cache_entry(&self, source_hash: String, quality: Option<u32>) -> CacheEntry {
        CacheEntry {
            source_hash,
            params_hash: self.params_hash.to_string(),
            quality,
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, CacheManifest> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_strict(&self, path: &Path) -> Result<(), ProcessError> {
        if self.config.strict {
            return Err(ProcessError::BudgetUnreachable {
                path: path.to_path_buf(),
                target: self.config.params.target,
                min_quality: self.config.params.range.min(),
            });
        }
        Ok(())
    }
}
