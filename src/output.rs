//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Each image leads with its positional index and file name. Paths, sizes
//! and the search result follow as indented context lines, so the output
//! reads as an inventory of what happened to every input.
//!
//! # Output Format
//!
//! ## Compress
//!
//! ```text
//! Compressing 2 images to 100KB (jpeg)
//! 001 dawn.jpg
//!     Source: photos/dawn.jpg
//!     Output: dawn-100kb.jpg
//!     q72: 1.2 MB → 98.4 KB (searched)
//! 002 scan.png
//!     Source: photos/scan.png
//!     Output: scan-100kb.png
//!     kept original: 1.4 MB, over budget (searched)
//!
//! Fitted 1 of 2 images, 1 kept original
//! 2.6 MB → 1.5 MB
//! Cache: 1 searched
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 dawn.jpg
//!     1920×1080, 1.2 MB
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions do no I/O.

use crate::cache::CacheStats;
use crate::imaging::{KB, MB};
use crate::presets::Preset;
use crate::process::{InputInfo, OutputStatus, ProcessEvent, Report, ReportEntry};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human-readable size with one decimal above a kilobyte.
///
/// Uses the same 1024-byte units as size budgets, so `100.0 KB` here is
/// exactly a `100kb` target.
pub fn format_size(bytes: u64) -> String {
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn status_label(status: OutputStatus) -> &'static str {
    match status {
        OutputStatus::Cached => "cached",
        OutputStatus::Copied => "copied",
        OutputStatus::Searched => "searched",
    }
}

// ============================================================================
// Compress
// ============================================================================

/// Display lines for one finished image.
fn format_entry(index: usize, entry: &ReportEntry) -> Vec<String> {
    let result = match entry.quality {
        Some(q) => format!(
            "q{}: {} \u{2192} {}",
            q,
            format_size(entry.original_bytes),
            format_size(entry.output_bytes)
        ),
        None => format!(
            "kept original: {}, over budget",
            format_size(entry.original_bytes)
        ),
    };
    vec![
        format!("{} {}", format_index(index), file_name(&entry.source)),
        format!("    Source: {}", entry.source),
        format!("    Output: {}", entry.output),
        format!("    {} ({})", result, status_label(entry.status)),
    ]
}

/// Format a single process progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started {
            total,
            target,
            format,
        } => {
            let noun = if *total == 1 { "image" } else { "images" };
            vec![format!(
                "Compressing {} {} to {} ({})",
                total,
                noun,
                target,
                format.name()
            )]
        }
        ProcessEvent::ImageProcessed { index, entry } => format_entry(*index, entry),
    }
}

/// Final summary after all images are done.
pub fn format_summary(report: &Report, cache_stats: &CacheStats) -> Vec<String> {
    let mut lines = vec![String::new()];
    let total = report.images.len();
    let kept = report.kept_original();
    if kept == 0 {
        lines.push(format!("Fitted {} of {} images", report.fitted(), total));
    } else {
        lines.push(format!(
            "Fitted {} of {} images, {} kept original",
            report.fitted(),
            total,
            kept
        ));
    }
    lines.push(format!(
        "{} \u{2192} {}",
        format_size(report.original_bytes()),
        format_size(report.output_bytes())
    ));
    lines.push(format!("Cache: {}", cache_stats));
    lines
}

pub fn print_summary(report: &Report, cache_stats: &CacheStats) {
    for line in format_summary(report, cache_stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check(infos: &[InputInfo]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, info) in infos.iter().enumerate() {
        let name = info.path.to_string_lossy();
        lines.push(format!("{} {}", format_index(i + 1), file_name(&name)));
        lines.push(format!(
            "    {}\u{d7}{}, {}",
            info.dimensions.width,
            info.dimensions.height,
            format_size(info.bytes)
        ));
    }
    lines
}

pub fn print_check(infos: &[InputInfo]) {
    for line in format_check(infos) {
        println!("{}", line);
    }
}

// ============================================================================
// Presets
// ============================================================================

pub fn format_presets(presets: &[Preset]) -> Vec<String> {
    presets
        .iter()
        .map(|p| format!("{:<7} {:>9} bytes", p.name, p.size.bytes()))
        .collect()
}

pub fn print_presets(presets: &[Preset]) {
    for line in format_presets(presets) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
