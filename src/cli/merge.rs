// merge.rs - Merge configuration file with CLI arguments

use crate::cli::{Args, Config};
use crate::errors::Result;

impl Args {
    /// Merge with configuration from file
    /// CLI arguments take precedence over config file values
    pub fn merge_with_config(mut self, config: Config) -> Self {
        // Inputs
        if self.tumor.is_empty() {
            self.tumor = config.tumors.unwrap_or_default();
        }
        if self.normal.is_empty() {
            self.normal = config.normals.unwrap_or_default();
        }
        if self.tumors_list.is_none() {
            self.tumors_list = config.tumors_list;
        }
        if self.normals_list.is_none() {
            self.normals_list = config.normals_list;
        }
        if self.num_tumors.is_none() {
            self.num_tumors = config.num_tumors;
        }
        if self.num_normals.is_none() {
            self.num_normals = config.num_normals;
        }
        if self.markers.is_none() {
            self.markers = config.markers;
        }

        // Output
        if self.output.is_none() {
            self.output = config.output;
        }
        if self.format.is_none() {
            self.format = config.format;
        }

        // Comparison policy
        if self.min_mapping_quality.is_none() {
            self.min_mapping_quality = config.min_mapping_quality;
        }
        if self.min_base_quality.is_none() {
            self.min_base_quality = config.min_base_quality;
        }
        if self.min_cov.is_none() {
            self.min_cov = config.min_cov;
        }

        // Performance
        if self.threads.is_none() {
            self.threads = config.threads;
        }
        if self.cache_dir.is_none() {
            self.cache_dir = config.cache_dir;
        }
        if self.cache_note.is_none() {
            self.cache_note = config.cache_note;
        }

        // Sample naming and filtering
        if self.manifest_dir.is_none() {
            self.manifest_dir = config.manifest_dir;
        }
        if self.include_samples.is_none() {
            self.include_samples = config.include_samples;
        }
        if self.exclude_samples.is_none() {
            self.exclude_samples = config.exclude_samples;
        }
        if self.benchmarks_file.is_none() {
            self.benchmarks_file = config.benchmarks_file;
        }

        // Flags (a switch given on the command line always wins)
        self.normal_homozygous_markers_only |=
            config.normal_homozygous_markers_only.unwrap_or(false);
        self.use_manifests |= config.use_manifests.unwrap_or(false);
        self.save_benchmarks |= config.save_benchmarks.unwrap_or(false);
        self.no_progress |= config.no_progress.unwrap_or(false);

        self
    }

    /// Load configuration and merge with CLI args
    pub fn with_config_file(self, config_path: &str) -> Result<Self> {
        let config = Config::from_file(config_path)?;
        Ok(self.merge_with_config(config))
    }
}
