//! # bytefit
//!
//! Compress images so each one fits a byte budget, keeping as much quality
//! as the budget allows. Upload forms, email gateways and embedded devices
//! cap file size, not quality; bytefit searches the encoder's quality scale
//! for the best setting under the cap.
//!
//! # Pipeline
//!
//! ```text
//! 1. Scan      paths      →  image list      (files + recursive directory walk)
//! 2. Search    each image →  best quality    (binary search, cached by content)
//! 3. Write     outputs    →  compressed/     (<stem>-<target>.<ext> + report.json)
//! ```
//!
//! The core is [`search::find_best_quality`], written against the
//! [`imaging::ImageBackend`] trait so it can be tested against a synthetic
//! size curve without touching a real codec.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`search`] | Binary search over quality for the largest encode that fits |
//! | [`imaging`] | Search parameters, source images, the encoder trait and its pure-Rust implementation |
//! | [`presets`] | Named byte budgets (`20kb`, `100kb`, `1mb`, ...) |
//! | [`scan`] | Expands command-line paths into the list of input images |
//! | [`process`] | Parallel batch run: cache lookup, search, output files, report |
//! | [`cache`] | Content-addressed manifest so unchanged images skip the search |
//! | [`config`] | `bytefit.toml` loading, validation, and merging over stock defaults |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | `tracing` subscriber setup for the binary |
//!
//! # Design Decisions
//!
//! ## Fallback Instead of Failure
//!
//! When even the minimum quality is over budget, the search returns the
//! original bytes untouched and reports no quality. A batch run keeps going
//! and the report shows which images were left alone. `strict` mode turns
//! that case into an error for pipelines that must enforce the limit.
//!
//! ## Pure-Rust Codecs
//!
//! Encoding uses the `image` crate's JPEG encoder and its `rav1e`-based AVIF
//! encoder, so the binary needs no system libraries.
//!
//! ## Binary Units
//!
//! `1kb` is 1024 bytes and `1mb` is 1024 × 1024 bytes, matching what most
//! upload limits and file managers mean.

pub mod cache;
pub mod config;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod presets;
pub mod process;
pub mod scan;
pub mod search;

#[cfg(test)]
pub(crate) mod test_helpers;
