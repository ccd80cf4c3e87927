//! Configuration module.
//!
//! Handles loading, validating, and merging `bytefit.toml`. Stock defaults
//! are overridden by the user's file, and command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [search]
//! format = "jpeg"        # Output codec: jpeg | avif
//! min_quality = 10       # Lowest quality the search may try (1-100)
//! max_quality = 100      # Highest quality the search may try (1-100)
//! # target = "100kb"     # Budget used when --target is omitted
//! strict = false         # Fail instead of keeping the original when nothing fits
//!
//! [output]
//! dir = "compressed"     # Where compressed files and report.json go
//!
//! [processing]
//! max_processes = 4      # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [search]
//! format = "avif"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{ByteSize, OutputFormat, QualityRange};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "bytefit.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `bytefit.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Quality search settings (format, range, default target).
    pub search: SearchConfig,
    /// Output location.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.search.quality_range()?;
        self.search.target()?;
        if self.output.dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output.dir must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Quality search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Output codec for compressed images.
    pub format: OutputFormat,
    /// Lowest quality the search may try.
    pub min_quality: u32,
    /// Highest quality the search may try.
    pub max_quality: u32,
    /// Default byte budget (size or preset name) when none is given on the command line.
    pub target: Option<String>,
    /// Treat an unreachable budget as an error rather than keeping the original.
    pub strict: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let range = QualityRange::default();
        Self {
            format: OutputFormat::default(),
            min_quality: range.min(),
            max_quality: range.max(),
            target: None,
            strict: false,
        }
    }
}

impl SearchConfig {
    pub fn quality_range(&self) -> Result<QualityRange, ConfigError> {
        QualityRange::new(self.min_quality, self.max_quality).map_err(|e| {
            ConfigError::Validation(format!("search.min_quality/max_quality: {e}"))
        })
    }

    pub fn target(&self) -> Result<Option<ByteSize>, ConfigError> {
        self.target
            .as_deref()
            .map(ByteSize::parse)
            .transpose()
            .map_err(|e| ConfigError::Validation(format!("search.target: {e}")))
    }
}

/// Output location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory receiving compressed files, `report.json`, and the cache manifest.
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "compressed".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(Config::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `bytefit.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# bytefit Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Quality search
# ---------------------------------------------------------------------------
[search]
# Output codec: "jpeg" or "avif".
format = "jpeg"

# Quality bounds the binary search works within (1 = worst, 100 = best).
# Each image costs at most floor(log2(max - min + 1)) + 1 encodes.
min_quality = 10
max_quality = 100

# Budget used when --target is omitted. A size ("150kb", "1.5mb", "20480")
# or a preset name (see `bytefit presets`).
# target = "100kb"

# When no quality fits, bytefit keeps the original file. Set to true to
# fail the run instead.
strict = false

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Directory for compressed files, report.json, and the encode cache.
dir = "compressed"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.search.format, OutputFormat::Jpeg);
        assert_eq!(config.search.min_quality, 10);
        assert_eq!(config.search.max_quality, 100);
        assert_eq!(config.search.target, None);
        assert!(!config.search.strict);
        assert_eq!(config.output.dir, "compressed");
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[search]
format = "avif"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.search.format, OutputFormat::Avif);
        // Defaults preserved
        assert_eq!(config.search.min_quality, 10);
        assert_eq!(config.output.dir, "compressed");
    }

    #[test]
    fn search_config_resolves_typed_values() {
        let toml = r#"
[search]
min_quality = 30
max_quality = 90
target = "1.5mb"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let range = config.search.quality_range().unwrap();
        assert_eq!((range.min(), range.max()), (30, 90));
        assert_eq!(
            config.search.target().unwrap(),
            Some(ByteSize::new(1536 * 1024).unwrap())
        );
    }

    #[test]
    fn preset_name_accepted_as_target() {
        let toml = r#"
[search]
target = "20kb"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.search.target().unwrap(), Some(ByteSize::kb(20)));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config.search.max_quality, 100);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r#"
[search]
strict = true

[output]
dir = "out"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.search.strict);
        assert_eq!(config.output.dir, "out");
        // Unspecified values should be defaults
        assert_eq!(config.search.format, OutputFormat::Jpeg);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r#"
[search]
min_quality = 80
max_quality = 40
"#,
        )
        .unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[search]
max_qualty = 90
"#;
        let result: Result<Config, _> = toml::from_str(toml_str);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let toml_str = r#"
[serch]
format = "jpeg"
"#;
        let result: Result<Config, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_format_rejected() {
        let toml_str = r#"
[search]
format = "webp"
"#;
        let result: Result<Config, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_out_of_bounds() {
        let mut config = Config::default();
        config.search.max_quality = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality"));

        let mut config = Config::default();
        config.search.min_quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_single_level_range_ok() {
        let mut config = Config::default();
        config.search.min_quality = 70;
        config.search.max_quality = 70;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_bad_target() {
        let mut config = Config::default();
        config.search.target = Some("a lot".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("search.target"));

        config.search.target = Some("0kb".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_empty_output_dir() {
        let mut config = Config::default();
        config.output.dir = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_processes() {
        let mut config = Config::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Processing config tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[search]
min_quality = 10
max_quality = 100
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[search]
max_quality = 85
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let search = merged.get("search").unwrap();
        assert_eq!(search.get("max_quality").unwrap().as_integer(), Some(85));
        assert_eq!(search.get("min_quality").unwrap().as_integer(), Some(10));
    }

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"dir = "a""#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"dir = "b""#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("dir").unwrap().as_str(), Some("b"));
    }

    #[test]
    fn resolve_config_with_overlay() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[processing]
max_processes = 2
"#,
        )
        .unwrap();
        let config = resolve_config(base, Some(overlay)).unwrap();
        assert_eq!(config.processing.max_processes, Some(2));
        assert_eq!(config.search.max_quality, 100);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.get("search").is_some());
        assert!(val.get("output").is_some());
        assert!(val.get("processing").is_some());
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: Config = toml::from_str(stock_config_toml()).unwrap();
        let defaults = Config::default();
        assert_eq!(config.search.format, defaults.search.format);
        assert_eq!(config.search.min_quality, defaults.search.min_quality);
        assert_eq!(config.search.max_quality, defaults.search.max_quality);
        assert_eq!(config.search.target, defaults.search.target);
        assert_eq!(config.search.strict, defaults.search.strict);
        assert_eq!(config.output.dir, defaults.output.dir);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[search]"));
        assert!(content.contains("[output]"));
        assert!(content.contains("[processing]"));
    }
}
