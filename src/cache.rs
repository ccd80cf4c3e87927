//! Search results remembered between runs.
//!
//! A quality search costs several full encodes per image, and AVIF through
//! rav1e is slow. The manifest written next to the outputs records which
//! source content and which search settings produced each file, so a rerun
//! over the same inputs does no encoding at all.
//!
//! ## Keys
//!
//! An entry is found by its source content and search settings, never by
//! file name:
//!
//! - `source_hash`: SHA-256 of the input file's bytes.
//! - `params_hash`: SHA-256 of the target size, output format and quality
//!   range.
//!
//! Renaming an input still hits; the stored output is copied to the new
//! name. Editing the image or changing any search setting misses.
//!
//! Each output path holds at most one entry, and the content index only
//! points at paths whose entry carries that content. When a path is
//! rewritten with new content, the old content stops resolving to it.
//!
//! ## On disk
//!
//! `<output_dir>/.cache-manifest.json`. A missing, unreadable or
//! older-version manifest starts an empty cache.

use crate::imaging::SearchParams;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

const MANIFEST_FILENAME: &str = ".cache-manifest.json";

/// Bumped whenever the entry layout or hashing changes.
const MANIFEST_VERSION: u32 = 1;

/// What produced one output file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
    /// Quality the search chose; `None` when the original was kept.
    pub quality: Option<u32>,
}

impl CacheEntry {
    fn content_key(&self) -> String {
        content_key(&self.source_hash, &self.params_hash)
    }
}

/// An output file that can stand in for a fresh search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHit {
    /// Relative to the output directory.
    pub output_path: String,
    pub quality: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    /// Output path → entry.
    pub entries: HashMap<String, CacheEntry>,
    /// `"{source_hash}:{params_hash}"` → output path. Rebuilt on load.
    #[serde(skip)]
    content_index: HashMap<String, String>,
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Read the manifest from `output_dir`, or start empty.
    pub fn load(output_dir: &Path) -> Self {
        let path = manifest_path(output_dir);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::empty();
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "ignoring unreadable cache manifest"
                );
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            tracing::info!(
                found = manifest.version,
                expected = MANIFEST_VERSION,
                "cache manifest version changed, starting fresh"
            );
            return Self::empty();
        }
        manifest.content_index = manifest
            .entries
            .iter()
            .map(|(output_path, entry)| (entry.content_key(), output_path.clone()))
            .collect();
        manifest
    }

    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(output_dir), json)
    }

    /// Find an output produced from this source with these settings.
    ///
    /// The entry stored at the path must still name the same content, and
    /// the file must still exist.
    pub fn find_cached(
        &self,
        source_hash: &str,
        params_hash: &str,
        output_dir: &Path,
    ) -> Option<CacheHit> {
        let stored_path = self
            .content_index
            .get(&content_key(source_hash, params_hash))?;
        let entry = self.entries.get(stored_path)?;
        if entry.source_hash != source_hash || entry.params_hash != params_hash {
            return None;
        }
        if !output_dir.join(stored_path).exists() {
            return None;
        }
        Some(CacheHit {
            output_path: stored_path.clone(),
            quality: entry.quality,
        })
    }

    /// Record that `output_path` now holds the result described by `entry`.
    ///
    /// Whatever content the path held before no longer resolves to it, and
    /// an older path holding the same content is forgotten.
    pub fn insert(&mut self, output_path: String, entry: CacheEntry) {
        let key = entry.content_key();

        if let Some(previous) = self.entries.get(&output_path) {
            let previous_key = previous.content_key();
            if previous_key != key
                && self.content_index.get(&previous_key) == Some(&output_path)
            {
                self.content_index.remove(&previous_key);
            }
        }

        if let Some(old_path) = self.content_index.get(&key)
            && *old_path != output_path
        {
            self.entries.remove(old_path.as_str());
        }

        self.content_index.insert(key, output_path.clone());
        self.entries.insert(output_path, entry);
    }
}

fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{}:{}", source_hash, params_hash)
}

/// Hex SHA-256 of an input file's bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Hex SHA-256 over everything that changes a search's result.
pub fn hash_search_params(params: &SearchParams) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"search\0");
    hasher.update(params.target.bytes().to_le_bytes());
    hasher.update(params.format.name().as_bytes());
    hasher.update(b"\0");
    hasher.update(params.range.min().to_le_bytes());
    hasher.update(params.range.max().to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// How each image of a run was produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn copy(&mut self) {
        self.copies += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.hits, self.copies) {
            (0, 0) => write!(f, "{} searched", self.misses),
            (hits, 0) => write!(
                f,
                "{} cached, {} searched ({} total)",
                hits,
                self.misses,
                self.total()
            ),
            (hits, copies) => write!(
                f,
                "{} cached, {} copied, {} searched ({} total)",
                hits,
                copies,
                self.misses,
                self.total()
            ),
        }
    }
}

pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{ByteSize, OutputFormat, QualityRange};
    use std::fs;
    use tempfile::TempDir;

    fn entry(source: &str, params: &str, quality: Option<u32>) -> CacheEntry {
        CacheEntry {
            source_hash: source.into(),
            params_hash: params.into(),
            quality,
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    #[test]
    fn empty_manifest_has_no_entries() {
        let m = CacheManifest::empty();
        assert_eq!(m.version, MANIFEST_VERSION);
        assert!(m.entries.is_empty());
        assert!(m.content_index.is_empty());
    }

    #[test]
    fn hit_returns_path_and_quality() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("photo-100kb.jpg".into(), entry("src123", "prm456", Some(72)));
        fs::write(tmp.path().join("photo-100kb.jpg"), "data").unwrap();

        assert_eq!(
            m.find_cached("src123", "prm456", tmp.path()),
            Some(CacheHit {
                output_path: "photo-100kb.jpg".into(),
                quality: Some(72),
            })
        );
    }

    #[test]
    fn other_source_misses() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("out.jpg".into(), entry("hash_a", "params", Some(50)));
        fs::write(tmp.path().join("out.jpg"), "data").unwrap();

        assert_eq!(m.find_cached("hash_b", "params", tmp.path()), None);
    }

    #[test]
    fn other_params_miss() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("out.jpg".into(), entry("hash", "params_a", Some(50)));
        fs::write(tmp.path().join("out.jpg"), "data").unwrap();

        assert_eq!(m.find_cached("hash", "params_b", tmp.path()), None);
    }

    #[test]
    fn deleted_output_misses() {
        let mut m = CacheManifest::empty();
        m.insert("gone.jpg".into(), entry("h", "p", None));
        let tmp = TempDir::new().unwrap();
        assert_eq!(m.find_cached("h", "p", tmp.path()), None);
    }

    #[test]
    fn moved_content_drops_old_path() {
        let mut m = CacheManifest::empty();
        m.insert("old-100kb.jpg".into(), entry("src", "prm", Some(80)));
        m.insert("new-100kb.jpg".into(), entry("src", "prm", Some(80)));

        assert!(!m.entries.contains_key("old-100kb.jpg"));
        assert!(m.entries.contains_key("new-100kb.jpg"));
    }

    #[test]
    fn rewritten_path_no_longer_serves_old_content() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a-10b.png"), "content-Y").unwrap();
        let mut m = CacheManifest::empty();
        m.insert("a-10b.png".into(), entry("hash_x", "prm", None));
        m.insert("a-10b.png".into(), entry("hash_y", "prm", None));

        assert_eq!(m.find_cached("hash_x", "prm", tmp.path()), None);
        assert!(!m.content_index.contains_key("hash_x:prm"));
        assert_eq!(
            m.find_cached("hash_y", "prm", tmp.path()).unwrap().output_path,
            "a-10b.png"
        );
    }

    #[test]
    fn index_pointing_at_foreign_entry_misses() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.jpg"), "data").unwrap();
        let mut m = CacheManifest::empty();
        m.entries.insert("a.jpg".into(), entry("hash_y", "prm", Some(40)));
        m.content_index.insert("hash_x:prm".into(), "a.jpg".into());

        assert_eq!(m.find_cached("hash_x", "prm", tmp.path()), None);
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    #[test]
    fn save_then_load_keeps_entries() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("a-5kb.jpg".into(), entry("s1", "p1", Some(31)));
        m.insert("b-5kb.png".into(), entry("s2", "p1", None));
        m.save(tmp.path()).unwrap();
        fs::write(tmp.path().join("a-5kb.jpg"), "jpeg").unwrap();

        let loaded = CacheManifest::load(tmp.path());
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(
            loaded.find_cached("s1", "p1", tmp.path()).unwrap().quality,
            Some(31)
        );
        // Indexed even though its file is gone
        assert_eq!(
            loaded.content_index.get("s2:p1"),
            Some(&"b-5kb.png".to_string())
        );
    }

    #[test]
    fn load_missing_manifest_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn load_corrupt_manifest_is_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(manifest_path(tmp.path()), "{not json").unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn load_version_mismatch_is_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            manifest_path(tmp.path()),
            r#"{"version": 999, "entries": {"x.jpg": {"source_hash": "s", "params_hash": "p", "quality": 50}}}"#,
        )
        .unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());
    }

    // =========================================================================
    // Hashing
    // =========================================================================

    #[test]
    fn hash_bytes_is_stable_hex() {
        let h = hash_bytes(b"abc");
        assert_eq!(
            h,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn params_hash_changes_with_every_input() {
        let base = SearchParams::new(ByteSize::kb(100));
        let h = hash_search_params(&base);
        assert_eq!(h, hash_search_params(&base));

        let other_target = SearchParams::new(ByteSize::kb(101));
        let other_format = base.with_format(OutputFormat::Avif);
        let other_range = base.with_range(QualityRange::new(10, 99).unwrap());
        assert_ne!(h, hash_search_params(&other_target));
        assert_ne!(h, hash_search_params(&other_format));
        assert_ne!(h, hash_search_params(&other_range));
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn stats_display_all_searched() {
        let mut s = CacheStats::default();
        s.miss();
        s.miss();
        assert_eq!(s.to_string(), "2 searched");
    }

    #[test]
    fn stats_display_with_hits() {
        let mut s = CacheStats::default();
        s.hit();
        s.miss();
        assert_eq!(s.to_string(), "1 cached, 1 searched (2 total)");
    }

    #[test]
    fn stats_display_with_copies() {
        let mut s = CacheStats::default();
        s.hit();
        s.copy();
        s.miss();
        assert_eq!(s.to_string(), "1 cached, 1 copied, 1 searched (3 total)");
    }

    #[test]
    fn stats_display_copies_without_hits() {
        let mut s = CacheStats::default();
        s.copy();
        assert_eq!(s.to_string(), "0 cached, 1 copied, 0 searched (1 total)");
    }
}
