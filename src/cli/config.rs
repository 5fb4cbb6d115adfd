// config.rs - Configuration file support

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    // Inputs
    pub tumors: Option<Vec<String>>,
    pub normals: Option<Vec<String>>,
    pub tumors_list: Option<String>,
    pub normals_list: Option<String>,
    pub num_tumors: Option<usize>,
    pub num_normals: Option<usize>,
    pub markers: Option<String>,

    // Output
    pub output: Option<String>,
    pub format: Option<String>,

    // Comparison policy
    pub min_mapping_quality: Option<u8>,
    pub min_base_quality: Option<u8>,
    pub min_cov: Option<u32>,
    pub normal_homozygous_markers_only: Option<bool>,

    // Performance
    pub threads: Option<usize>,
    pub cache_dir: Option<String>,
    pub cache_note: Option<String>,

    // Sample naming and filtering
    pub use_manifests: Option<bool>,
    pub manifest_dir: Option<String>,
    pub include_samples: Option<String>,
    pub exclude_samples: Option<String>,

    // Flags
    pub save_benchmarks: Option<bool>,
    pub benchmarks_file: Option<String>,
    pub no_progress: Option<bool>,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# conpair.toml - Configuration file for conpair
# Command line arguments will override these settings

# =============================================================================
# INPUTS
# =============================================================================

# Marker panel: one marker per line, "chrom pos ref alt"
markers = "/path/to/markers.txt"

# Tumor and normal samples: samtools pileups or .lz4 likelihood caches.
# Glob patterns are expanded, e.g. "/path/to/*tumor*.pileup"
tumors = ["/path/to/T1.pileup", "/path/to/T2.pileup"]
normals = ["/path/to/N1.pileup"]

# Or files listing one sample path per line (used when tumors/normals are unset)
# tumors_list = "tumors.txt"
# normals_list = "normals.txt"

# Use only the first N samples of each list
# num_tumors = 10
# num_normals = 10

# =============================================================================
# OUTPUT
# =============================================================================

# Output file ("-" for stdout)
output = "concordance.tsv"

# Output format: tsv, json
format = "tsv"

# =============================================================================
# COMPARISON POLICY
# =============================================================================

# Read filters used when deriving likelihoods from pileups
min_mapping_quality = 10
min_base_quality = 20

# Minimum informative reads in both samples for a marker to count
min_cov = 10

# Only count markers where the normal sample is homozygous
normal_homozygous_markers_only = false

# =============================================================================
# PERFORMANCE
# =============================================================================

# Number of worker threads
threads = 4

# Directory for .lz4 likelihood caches written with --cache-only
# cache_dir = "likelihood_cache"

# User note to save with the caches for future reference
# cache_note = "Run 42 pileups"

# =============================================================================
# SAMPLE NAMING AND FILTERING
# =============================================================================

# Take sample names from the "id" field of <file name>.json manifests
use_manifests = false
# manifest_dir = "/path/to/manifests"

# Include only samples matching regex pattern
# include_samples = "^PT.*"

# Exclude samples matching regex pattern
# exclude_samples = "control.*"

# =============================================================================
# FLAGS
# =============================================================================

# Append run timing to the benchmarks file
save_benchmarks = false
# benchmarks_file = "benchmarks.tsv"

# Hide progress bars
no_progress = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::generate_sample()).unwrap();
        assert_eq!(config.markers.as_deref(), Some("/path/to/markers.txt"));
        assert_eq!(config.tumors.as_ref().map(Vec::len), Some(2));
        assert_eq!(config.min_cov, Some(10));
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.normal_homozygous_markers_only, Some(false));
        assert!(config.tumors_list.is_none());
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conpair.toml");
        let config = Config {
            markers: Some("panel.txt".to_string()),
            min_cov: Some(15),
            exclude_samples: Some("^ctrl".to_string()),
            ..Config::default()
        };

        fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "min_cov = \"ten\"\n").unwrap();
        assert!(matches!(Config::from_file(&path), Err(Error::Config { .. })));
    }
}
