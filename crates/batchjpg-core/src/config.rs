//! Run configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! scan, worker, and conversion sections. Every section defaults sensibly so
//! a completely empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::Error;

/// Default number of files per batch handed to the worker pool.
pub const DEFAULT_MAX_FILES_PER_BATCH: usize = 1000;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub workers: WorkerConfig,
    pub conversion: ConversionConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.scan.max_files_per_batch > 10 * DEFAULT_MAX_FILES_PER_BATCH {
            warnings.push(format!(
                "scan.max_files_per_batch is {}; large batches increase peak memory",
                self.scan.max_files_per_batch
            ));
        }

        if self.scan.skip_dirs.iter().any(|d| d.contains('/') || d.contains('\\')) {
            warnings.push(
                "scan.skip_dirs entries are matched against directory names, not paths".into(),
            );
        }

        if self.conversion.quality < 50 {
            warnings.push(format!(
                "conversion.quality {} is very low; output may show heavy artifacts",
                self.conversion.quality
            ));
        }

        if let Some(ref path) = self.conversion.cjpeg_path {
            if !path.exists() {
                warnings.push(format!(
                    "conversion.cjpeg_path {} does not exist; falling back to PATH",
                    path.display()
                ));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Tree walk settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Extension of files to convert, without the leading dot.
    pub source_extension: String,
    /// Directory names that are never descended into.
    pub skip_dirs: Vec<String>,
    pub max_files_per_batch: usize,
    /// How many batches may be outstanding in the pool before the walker
    /// waits for workers to catch up.
    pub max_outstanding_batches: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            source_extension: "png".into(),
            skip_dirs: vec!["node_modules".into()],
            max_files_per_batch: DEFAULT_MAX_FILES_PER_BATCH,
            max_outstanding_batches: 2,
        }
    }
}

impl ScanConfig {
    /// Source extension, lowercased and without a leading dot.
    pub fn normalized_extension(&self) -> String {
        normalize_extension(&self.source_extension)
    }

    /// Upper bound on queued plus running jobs.
    pub fn max_outstanding_files(&self) -> usize {
        self.max_files_per_batch
            .saturating_mul(self.max_outstanding_batches)
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Cores left free for the rest of the system.
    pub reserved_cores: usize,
    /// Explicit worker count; overrides the core-based computation.
    pub max_workers: Option<usize>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            reserved_cores: 2,
            max_workers: None,
        }
    }
}

impl WorkerConfig {
    /// Number of concurrent workers for a host with `available` cores.
    ///
    /// Never returns less than one.
    pub fn concurrency(&self, available: usize) -> usize {
        match self.max_workers {
            Some(n) => n.max(1),
            None => available.saturating_sub(self.reserved_cores).max(1),
        }
    }
}

/// External converter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Extension of the converted output, without the leading dot.
    pub target_extension: String,
    /// JPEG quality passed to the encoder (1-100).
    pub quality: u8,
    pub delete_original: bool,
    /// Override for the cjpeg executable; `PATH` is searched otherwise.
    pub cjpeg_path: Option<PathBuf>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            target_extension: "jpg".into(),
            quality: 90,
            delete_original: false,
            cjpeg_path: None,
        }
    }
}

impl ConversionConfig {
    /// Target extension, lowercased and without a leading dot.
    pub fn normalized_extension(&self) -> String {
        normalize_extension(&self.target_extension)
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.scan.source_extension, "png");
        assert_eq!(config.scan.skip_dirs, vec!["node_modules".to_string()]);
        assert_eq!(config.scan.max_files_per_batch, 1000);
        assert_eq!(config.conversion.quality, 90);
        assert!(!config.conversion.delete_original);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
[scan]
max_files_per_batch = 50

[conversion]
quality = 75
delete_original = true
"#,
        )
        .unwrap();
        assert_eq!(config.scan.max_files_per_batch, 50);
        assert_eq!(config.scan.source_extension, "png");
        assert_eq!(config.conversion.quality, 75);
        assert!(config.conversion.delete_original);
        assert_eq!(config.workers.reserved_cores, 2);
    }

    #[test]
    fn malformed_toml_is_validation_error() {
        let err = Config::from_toml("[scan\nmax_files_per_batch = ").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn concurrency_reserves_cores_with_floor_of_one() {
        let workers = WorkerConfig::default();
        assert_eq!(workers.concurrency(8), 6);
        assert_eq!(workers.concurrency(2), 1);
        assert_eq!(workers.concurrency(1), 1);
        assert_eq!(workers.concurrency(0), 1);
    }

    #[test]
    fn explicit_worker_count_wins() {
        let workers = WorkerConfig {
            reserved_cores: 2,
            max_workers: Some(3),
        };
        assert_eq!(workers.concurrency(64), 3);

        let zero = WorkerConfig {
            reserved_cores: 0,
            max_workers: Some(0),
        };
        assert_eq!(zero.concurrency(64), 1);
    }

    #[test]
    fn extensions_are_normalized() {
        let scan = ScanConfig {
            source_extension: ".PNG".into(),
            ..ScanConfig::default()
        };
        assert_eq!(scan.normalized_extension(), "png");

        let conversion = ConversionConfig {
            target_extension: " .Jpg".into(),
            ..ConversionConfig::default()
        };
        assert_eq!(conversion.normalized_extension(), "jpg");
    }

    #[test]
    fn outstanding_limit_is_batches_times_batch_size() {
        let scan = ScanConfig {
            max_files_per_batch: 10,
            max_outstanding_batches: 3,
            ..ScanConfig::default()
        };
        assert_eq!(scan.max_outstanding_files(), 30);
    }

    #[test]
    fn validate_flags_low_quality_and_path_like_skip_dirs() {
        let mut config = Config::default();
        assert!(config.validate().is_empty());

        config.conversion.quality = 10;
        config.scan.skip_dirs.push("vendor/lib".into());
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("quality")));
        assert!(warnings.iter().any(|w| w.contains("skip_dirs")));
    }
}
